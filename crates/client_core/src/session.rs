//! Review-session state machine.
//!
//! `Session::apply` is the whole transition table: it never performs I/O.
//! Any network or filesystem work a transition needs is handed back as a
//! [`Command`] for the controller to run, and the outcome comes back in as
//! another [`Event`].

use std::path::{Path, PathBuf};

use shared::domain::{Card, CardField, DEFAULT_DECK_NAME};
use tracing::{debug, info};

use crate::{
    collection::CardCollection, download::deck_file_name, error::ServiceError,
    transport::DeckArtifact, validation::PdfUpload,
};

pub const EMPTY_EXTRACTION_HINT: &str =
    "No cards were extracted. Make sure your PDF has bold questions with answers below them.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateTag {
    Idle,
    Uploading,
    Preview,
    Generating,
}

impl StateTag {
    pub fn as_str(self) -> &'static str {
        match self {
            StateTag::Idle => "idle",
            StateTag::Uploading => "uploading",
            StateTag::Preview => "preview",
            StateTag::Generating => "generating",
        }
    }

    /// Busy-indicator copy for the two waiting states.
    pub fn activity_label(self) -> Option<&'static str> {
        match self {
            StateTag::Uploading => Some("Extracting cards from PDF..."),
            StateTag::Generating => Some("Building Anki deck..."),
            StateTag::Idle | StateTag::Preview => None,
        }
    }
}

impl std::fmt::Display for StateTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything that only exists while cards are on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Review {
    cards: CardCollection,
    deck_name: String,
    edit_focus: Option<usize>,
    last_saved: Option<PathBuf>,
}

impl Review {
    fn new(cards: Vec<Card>) -> Self {
        let mut collection = CardCollection::new();
        collection.replace_all(cards);
        Self {
            cards: collection,
            deck_name: DEFAULT_DECK_NAME.to_string(),
            edit_focus: None,
            last_saved: None,
        }
    }

    pub fn cards(&self) -> &CardCollection {
        &self.cards
    }

    pub fn deck_name(&self) -> &str {
        &self.deck_name
    }

    pub fn edit_focus(&self) -> Option<usize> {
        self.edit_focus
    }

    pub fn last_saved(&self) -> Option<&Path> {
        self.last_saved.as_deref()
    }

    fn delete_card(&mut self, index: usize) {
        if self.cards.remove_at(index).is_none() {
            return;
        }
        self.edit_focus = match self.edit_focus {
            Some(focus) if focus == index => None,
            Some(focus) if focus > index => Some(focus - 1),
            other => other,
        };
    }

    fn toggle_focus(&mut self, index: usize) {
        if index >= self.cards.count() {
            return;
        }
        self.edit_focus = if self.edit_focus == Some(index) {
            None
        } else {
            Some(index)
        };
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    Uploading {
        file_name: String,
    },
    Preview(Review),
    Generating(Review),
}

impl Phase {
    pub fn tag(&self) -> StateTag {
        match self {
            Phase::Idle => StateTag::Idle,
            Phase::Uploading { .. } => StateTag::Uploading,
            Phase::Preview(_) => StateTag::Preview,
            Phase::Generating(_) => StateTag::Generating,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    FileSelected(PdfUpload),
    ExtractionSucceeded(Vec<Card>),
    ExtractionFailed(ServiceError),
    DownloadRequested,
    PackagingSucceeded(DeckArtifact),
    PackagingFailed(ServiceError),
    ArtifactSaved(PathBuf),
    ArtifactSaveFailed(String),
    RequestCancelled,
    ResetRequested,
    CardDeleted(usize),
    CardEdited {
        index: usize,
        field: CardField,
        value: String,
    },
    EditFocusToggled(usize),
    DeckNameChanged(String),
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::FileSelected(_) => "file_selected",
            Event::ExtractionSucceeded(_) => "extraction_succeeded",
            Event::ExtractionFailed(_) => "extraction_failed",
            Event::DownloadRequested => "download_requested",
            Event::PackagingSucceeded(_) => "packaging_succeeded",
            Event::PackagingFailed(_) => "packaging_failed",
            Event::ArtifactSaved(_) => "artifact_saved",
            Event::ArtifactSaveFailed(_) => "artifact_save_failed",
            Event::RequestCancelled => "request_cancelled",
            Event::ResetRequested => "reset_requested",
            Event::CardDeleted(_) => "card_deleted",
            Event::CardEdited { .. } => "card_edited",
            Event::EditFocusToggled(_) => "edit_focus_toggled",
            Event::DeckNameChanged(_) => "deck_name_changed",
        }
    }
}

/// Side effects a transition asks the controller to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SubmitExtraction(PdfUpload),
    SubmitPackaging { cards: Vec<Card>, deck_name: String },
    SaveArtifact {
        file_name: String,
        artifact: DeckArtifact,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// The event was applied and a command must run next.
    Run(Command),
    /// The event was applied; nothing further to do.
    Settled,
    /// The event is not valid in the current state and changed nothing.
    Ignored,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    phase: Phase,
    error: Option<String>,
}

/// By-value form of [`Session::apply`].
pub fn transition(mut session: Session, event: Event) -> (Session, Step) {
    let step = session.apply(event);
    (session, step)
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: Event) -> Step {
        let from = self.state();
        let event_name = event.name();
        let phase = std::mem::take(&mut self.phase);

        let (phase, step) = match (phase, event) {
            (Phase::Idle, Event::FileSelected(upload)) => match upload.validate() {
                Ok(()) => {
                    self.error = None;
                    let file_name = upload.file_name.clone();
                    (
                        Phase::Uploading { file_name },
                        Step::Run(Command::SubmitExtraction(upload)),
                    )
                }
                Err(err) => {
                    info!(file_name = %upload.file_name, error = %err, "upload rejected before submit");
                    self.error = Some(err.to_string());
                    (Phase::Idle, Step::Settled)
                }
            },
            (Phase::Idle, Event::ResetRequested) => {
                self.error = None;
                (Phase::Idle, Step::Settled)
            }

            (Phase::Uploading { .. }, Event::ExtractionSucceeded(cards)) => {
                (Phase::Preview(Review::new(cards)), Step::Settled)
            }
            (Phase::Uploading { .. }, Event::ExtractionFailed(err)) => {
                self.error = Some(err.to_string());
                (Phase::Idle, Step::Settled)
            }
            (Phase::Uploading { .. }, Event::RequestCancelled) => (Phase::Idle, Step::Settled),

            (Phase::Preview(review), Event::DownloadRequested) if !review.cards.is_empty() => {
                self.error = None;
                let command = Command::SubmitPackaging {
                    cards: review.cards.to_vec(),
                    deck_name: review.deck_name.clone(),
                };
                (Phase::Generating(review), Step::Run(command))
            }
            (Phase::Preview(mut review), Event::ArtifactSaved(path)) => {
                review.last_saved = Some(path);
                (Phase::Preview(review), Step::Settled)
            }
            (Phase::Preview(review), Event::ArtifactSaveFailed(reason)) => {
                self.error = Some(format!("Failed to save deck: {reason}"));
                (Phase::Preview(review), Step::Settled)
            }
            (Phase::Preview(_), Event::ResetRequested) => {
                self.error = None;
                (Phase::Idle, Step::Settled)
            }
            (Phase::Preview(mut review), Event::CardDeleted(index)) => {
                review.delete_card(index);
                (Phase::Preview(review), Step::Settled)
            }
            (Phase::Preview(mut review), Event::CardEdited { index, field, value }) => {
                review.cards.update_field(index, field, value);
                (Phase::Preview(review), Step::Settled)
            }
            (Phase::Preview(mut review), Event::EditFocusToggled(index)) => {
                review.toggle_focus(index);
                (Phase::Preview(review), Step::Settled)
            }
            (Phase::Preview(mut review), Event::DeckNameChanged(name)) => {
                review.deck_name = name;
                (Phase::Preview(review), Step::Settled)
            }

            (Phase::Generating(review), Event::PackagingSucceeded(artifact)) => {
                let file_name = deck_file_name(&review.deck_name);
                (
                    Phase::Preview(review),
                    Step::Run(Command::SaveArtifact {
                        file_name,
                        artifact,
                    }),
                )
            }
            (Phase::Generating(review), Event::PackagingFailed(err)) => {
                self.error = Some(err.to_string());
                (Phase::Preview(review), Step::Settled)
            }
            (Phase::Generating(review), Event::RequestCancelled) => {
                (Phase::Preview(review), Step::Settled)
            }

            (phase, _) => {
                debug!(state = %from, event = event_name, "ignoring event");
                (phase, Step::Ignored)
            }
        };

        self.phase = phase;
        let to = self.state();
        if from != to {
            info!(from = %from, to = %to, event = event_name, "session transition");
        }
        step
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn state(&self) -> StateTag {
        self.phase.tag()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn review(&self) -> Option<&Review> {
        match &self.phase {
            Phase::Preview(review) | Phase::Generating(review) => Some(review),
            Phase::Idle | Phase::Uploading { .. } => None,
        }
    }

    pub fn cards(&self) -> &[Card] {
        self.review()
            .map(|review| review.cards.as_slice())
            .unwrap_or(&[])
    }

    pub fn card_count(&self) -> usize {
        self.cards().len()
    }

    pub fn deck_name(&self) -> &str {
        self.review()
            .map(Review::deck_name)
            .unwrap_or(DEFAULT_DECK_NAME)
    }

    pub fn edit_focus(&self) -> Option<usize> {
        self.review().and_then(Review::edit_focus)
    }

    pub fn last_saved(&self) -> Option<&Path> {
        self.review().and_then(Review::last_saved)
    }

    pub fn uploading_file_name(&self) -> Option<&str> {
        match &self.phase {
            Phase::Uploading { file_name } => Some(file_name.as_str()),
            _ => None,
        }
    }

    /// Download is offered only in preview with at least one card.
    pub fn can_download(&self) -> bool {
        self.state() == StateTag::Preview && self.card_count() > 0
    }

    pub fn card_count_label(&self) -> String {
        card_count_label(self.card_count())
    }
}

pub fn card_count_label(count: usize) -> String {
    if count == 1 {
        "1 card found".to_string()
    } else {
        format!("{count} cards found")
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
