//! Drives a [`Session`] and runs the commands its transitions emit.

use std::{future::Future, sync::Arc};

use shared::domain::CardField;
use tokio::sync::Notify;
use tracing::{error, info, warn};

use crate::{
    download::ArtifactSink,
    session::{Command, Event, Session, Step},
    transport::{ExtractionService, HttpDeckServices, PackagingService},
    validation::PdfUpload,
};

/// Whether a controller call was accepted by the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Applied,
    Ignored,
}

/// Cancels whichever request the controller is currently awaiting.
///
/// A cancel with no request in flight does nothing and is not remembered.
#[derive(Clone)]
pub struct CancelHandle {
    notify: Arc<Notify>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.notify.notify_waiters();
    }
}

pub struct WorkflowController {
    session: Session,
    extraction: Arc<dyn ExtractionService>,
    packaging: Arc<dyn PackagingService>,
    sink: Arc<dyn ArtifactSink>,
    cancel: Arc<Notify>,
}

impl WorkflowController {
    pub fn new(
        extraction: Arc<dyn ExtractionService>,
        packaging: Arc<dyn PackagingService>,
        sink: Arc<dyn ArtifactSink>,
    ) -> Self {
        Self {
            session: Session::new(),
            extraction,
            packaging,
            sink,
            cancel: Arc::new(Notify::new()),
        }
    }

    pub fn with_http(services: Arc<HttpDeckServices>, sink: Arc<dyn ArtifactSink>) -> Self {
        Self::new(services.clone(), services, sink)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            notify: Arc::clone(&self.cancel),
        }
    }

    /// Validates the file and, if it passes, waits for extraction.
    pub async fn select_file(&mut self, upload: PdfUpload) -> Dispatch {
        self.dispatch(Event::FileSelected(upload)).await
    }

    /// Packages the current cards and saves the resulting deck.
    pub async fn download(&mut self) -> Dispatch {
        self.dispatch(Event::DownloadRequested).await
    }

    pub fn reset(&mut self) -> Dispatch {
        self.apply_local(Event::ResetRequested)
    }

    pub fn delete_card(&mut self, index: usize) -> Dispatch {
        self.apply_local(Event::CardDeleted(index))
    }

    pub fn edit_card(&mut self, index: usize, field: CardField, value: impl Into<String>) -> Dispatch {
        self.apply_local(Event::CardEdited {
            index,
            field,
            value: value.into(),
        })
    }

    pub fn toggle_edit(&mut self, index: usize) -> Dispatch {
        self.apply_local(Event::EditFocusToggled(index))
    }

    pub fn rename_deck(&mut self, name: impl Into<String>) -> Dispatch {
        self.apply_local(Event::DeckNameChanged(name.into()))
    }

    async fn dispatch(&mut self, event: Event) -> Dispatch {
        let mut step = self.session.apply(event);
        let dispatch = match step {
            Step::Ignored => Dispatch::Ignored,
            Step::Run(_) | Step::Settled => Dispatch::Applied,
        };
        while let Step::Run(command) = step {
            let outcome = self.run(command).await;
            step = self.session.apply(outcome);
        }
        dispatch
    }

    fn apply_local(&mut self, event: Event) -> Dispatch {
        match self.session.apply(event) {
            Step::Ignored => Dispatch::Ignored,
            Step::Settled => Dispatch::Applied,
            Step::Run(command) => {
                error!(?command, "local edit produced a command; dropping it");
                Dispatch::Applied
            }
        }
    }

    async fn run(&self, command: Command) -> Event {
        match command {
            Command::SubmitExtraction(upload) => {
                match self.cancellable(self.extraction.extract(&upload)).await {
                    Some(Ok(cards)) => Event::ExtractionSucceeded(cards),
                    Some(Err(err)) => Event::ExtractionFailed(err),
                    None => Event::RequestCancelled,
                }
            }
            Command::SubmitPackaging { cards, deck_name } => {
                match self
                    .cancellable(self.packaging.package(&cards, &deck_name))
                    .await
                {
                    Some(Ok(artifact)) => Event::PackagingSucceeded(artifact),
                    Some(Err(err)) => Event::PackagingFailed(err),
                    None => Event::RequestCancelled,
                }
            }
            Command::SaveArtifact {
                file_name,
                artifact,
            } => match self.sink.save(&file_name, artifact).await {
                Ok(path) => Event::ArtifactSaved(path),
                Err(err) => {
                    let reason = format!("{err:#}");
                    warn!(file_name = %file_name, error = %reason, "failed to save deck");
                    Event::ArtifactSaveFailed(reason)
                }
            },
        }
    }

    async fn cancellable<F: Future>(&self, request: F) -> Option<F::Output> {
        let cancelled = self.cancel.notified();
        tokio::select! {
            output = request => Some(output),
            _ = cancelled => {
                info!(state = %self.session.state(), "request cancelled");
                None
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
