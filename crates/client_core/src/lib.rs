//! Client-side workflow for turning a PDF of notes into a flashcard deck.
//!
//! [`WorkflowController`] owns one review [`Session`], validates input,
//! talks to the extraction and packaging services, and hands packaged
//! decks to an [`ArtifactSink`].

pub mod collection;
pub mod config;
pub mod controller;
pub mod download;
pub mod error;
pub mod session;
pub mod transport;
pub mod validation;

pub use collection::CardCollection;
pub use config::{load_settings, ClientSettings};
pub use controller::{CancelHandle, Dispatch, WorkflowController};
pub use download::{deck_file_name, ArtifactSink, DirectorySink};
pub use error::{Operation, ServiceError, ServiceFailure, ValidationError};
pub use session::{
    card_count_label, transition, Command, Event, Phase, Review, Session, StateTag, Step,
    EMPTY_EXTRACTION_HINT,
};
pub use transport::{DeckArtifact, ExtractionService, HttpDeckServices, PackagingService};
pub use validation::{validate_pdf, PdfUpload, MAX_PDF_BYTES};
