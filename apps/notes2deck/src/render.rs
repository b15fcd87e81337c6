//! Text rendering of a review session. Output depends only on the session.

use std::fmt::Write as _;

use client_core::{Session, StateTag, EMPTY_EXTRACTION_HINT};

pub fn render(session: &Session) -> String {
    let mut out = String::new();

    if let Some(error) = session.error() {
        let _ = writeln!(out, "error: {error}");
    }

    match session.state() {
        StateTag::Idle => {
            let _ = writeln!(out, "Load a PDF of your study notes to get started.");
        }
        StateTag::Uploading | StateTag::Generating => {
            if let Some(label) = session.state().activity_label() {
                let _ = writeln!(out, "{label}");
            }
        }
        StateTag::Preview => render_preview(session, &mut out),
    }

    out
}

fn render_preview(session: &Session, out: &mut String) {
    let _ = writeln!(out, "{}", session.card_count_label());
    let _ = writeln!(out, "Deck name: {}", session.deck_name());

    if session.card_count() == 0 {
        let _ = writeln!(out, "{EMPTY_EXTRACTION_HINT}");
    }

    for (idx, card) in session.cards().iter().enumerate() {
        let _ = write!(out, "#{}", idx + 1);
        if !card.tags.is_empty() {
            let _ = write!(out, " [{}]", card.tags.join(", "));
        }
        if session.edit_focus() == Some(idx) {
            let _ = writeln!(out, " (editing)");
            let _ = writeln!(out, "  Front: {}", card.front);
            let _ = writeln!(out, "  Back:  {}", card.back);
        } else {
            let _ = writeln!(out);
            let _ = writeln!(out, "  Q: {}", card.front);
            let _ = writeln!(out, "  A: {}", card.back);
        }
        if !card.images.is_empty() {
            let _ = writeln!(out, "  images: {}", card.images.len());
        }
    }

    if let Some(path) = session.last_saved() {
        let _ = writeln!(out, "Saved deck to {}", path.display());
    }
}
