use super::*;
use std::{
    path::{Path, PathBuf},
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use shared::domain::Card;
use tokio::sync::Mutex;

use crate::{
    error::{Operation, ServiceError},
    session::StateTag,
    transport::DeckArtifact,
};

struct TestExtraction {
    reply: Result<Vec<Card>, ServiceError>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl TestExtraction {
    fn ok(cards: Vec<Card>) -> Self {
        Self {
            reply: Ok(cards),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    fn failing(err: ServiceError) -> Self {
        Self {
            reply: Err(err),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExtractionService for TestExtraction {
    async fn extract(&self, _upload: &PdfUpload) -> Result<Vec<Card>, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.reply.clone()
    }
}

struct TestPackaging {
    reply: Result<DeckArtifact, ServiceError>,
    delay: Option<Duration>,
    requests: Mutex<Vec<(Vec<Card>, String)>>,
}

impl TestPackaging {
    fn ok(bytes: &[u8]) -> Self {
        Self {
            reply: Ok(DeckArtifact::new(
                bytes.to_vec(),
                Some("application/octet-stream".to_string()),
            )),
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    fn failing(err: ServiceError) -> Self {
        Self {
            reply: Err(err),
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl PackagingService for TestPackaging {
    async fn package(
        &self,
        cards: &[Card],
        deck_name: &str,
    ) -> Result<DeckArtifact, ServiceError> {
        self.requests
            .lock()
            .await
            .push((cards.to_vec(), deck_name.to_string()));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.reply.clone()
    }
}

#[derive(Default)]
struct RecordingSink {
    saved: Mutex<Vec<(String, Vec<u8>)>>,
    fail_with: Option<String>,
}

impl RecordingSink {
    fn failing(reason: &str) -> Self {
        Self {
            saved: Mutex::new(Vec::new()),
            fail_with: Some(reason.to_string()),
        }
    }
}

#[async_trait]
impl ArtifactSink for RecordingSink {
    async fn save(&self, file_name: &str, artifact: DeckArtifact) -> Result<PathBuf> {
        if let Some(reason) = &self.fail_with {
            return Err(anyhow!(reason.clone()));
        }
        self.saved
            .lock()
            .await
            .push((file_name.to_string(), artifact.bytes));
        Ok(Path::new("/decks").join(file_name))
    }
}

struct Harness {
    controller: WorkflowController,
    extraction: Arc<TestExtraction>,
    packaging: Arc<TestPackaging>,
    sink: Arc<RecordingSink>,
}

fn harness(extraction: TestExtraction, packaging: TestPackaging, sink: RecordingSink) -> Harness {
    let extraction = Arc::new(extraction);
    let packaging = Arc::new(packaging);
    let sink = Arc::new(sink);
    let controller = WorkflowController::new(extraction.clone(), packaging.clone(), sink.clone());
    Harness {
        controller,
        extraction,
        packaging,
        sink,
    }
}

fn pdf_of_size(size: usize) -> PdfUpload {
    PdfUpload::new(
        "notes.pdf",
        Some("application/pdf".to_string()),
        vec![0u8; size],
    )
}

fn three_cards() -> Vec<Card> {
    vec![
        Card::new("Q0", "A0"),
        Card::new("Q1", "A1"),
        Card::new("Q2", "A2"),
    ]
}

#[tokio::test]
async fn oversized_pdf_never_reaches_the_service() {
    let mut h = harness(
        TestExtraction::ok(three_cards()),
        TestPackaging::ok(b"deck"),
        RecordingSink::default(),
    );

    let dispatch = h.controller.select_file(pdf_of_size(25 * 1024 * 1024)).await;
    assert_eq!(dispatch, Dispatch::Applied);
    assert_eq!(h.controller.session().state(), StateTag::Idle);
    assert_eq!(
        h.controller.session().error(),
        Some("File exceeds 20 MB limit.")
    );
    assert_eq!(h.extraction.calls(), 0);
}

#[tokio::test]
async fn non_pdf_never_reaches_the_service() {
    let mut h = harness(
        TestExtraction::ok(three_cards()),
        TestPackaging::ok(b"deck"),
        RecordingSink::default(),
    );

    let upload = PdfUpload::new("notes.docx", Some("application/msword".into()), b"doc".to_vec());
    h.controller.select_file(upload).await;
    assert_eq!(h.controller.session().state(), StateTag::Idle);
    assert_eq!(
        h.controller.session().error(),
        Some("Please upload a PDF file.")
    );
    assert_eq!(h.extraction.calls(), 0);
}

#[tokio::test]
async fn valid_pdf_lands_in_preview_with_one_card() {
    let mut h = harness(
        TestExtraction::ok(vec![Card::new("Q1", "A1")]),
        TestPackaging::ok(b"deck"),
        RecordingSink::default(),
    );

    h.controller.select_file(pdf_of_size(2 * 1024 * 1024)).await;
    let session = h.controller.session();
    assert_eq!(session.state(), StateTag::Preview);
    assert_eq!(session.card_count(), 1);
    assert_eq!(session.card_count_label(), "1 card found");
    assert_eq!(h.extraction.calls(), 1);
}

#[tokio::test]
async fn failed_extraction_returns_to_idle() {
    let mut h = harness(
        TestExtraction::failing(ServiceError::status(Operation::Extraction, 503, None)),
        TestPackaging::ok(b"deck"),
        RecordingSink::default(),
    );

    h.controller.select_file(pdf_of_size(64)).await;
    assert_eq!(h.controller.session().state(), StateTag::Idle);
    assert_eq!(h.controller.session().error(), Some("Upload failed (503)"));
}

#[tokio::test]
async fn delete_then_download_saves_named_deck() {
    let mut h = harness(
        TestExtraction::ok(three_cards()),
        TestPackaging::ok(b"apkg-bytes"),
        RecordingSink::default(),
    );
    h.controller.select_file(pdf_of_size(64)).await;

    assert_eq!(h.controller.delete_card(1), Dispatch::Applied);
    assert_eq!(h.controller.rename_deck("Biology"), Dispatch::Applied);
    assert_eq!(h.controller.download().await, Dispatch::Applied);

    let session = h.controller.session();
    assert_eq!(session.state(), StateTag::Preview);
    assert_eq!(session.error(), None);
    assert_eq!(session.last_saved(), Some(Path::new("/decks/Biology.apkg")));

    let requests = h.packaging.requests.lock().await;
    assert_eq!(
        requests.as_slice(),
        &[(
            vec![Card::new("Q0", "A0"), Card::new("Q2", "A2")],
            "Biology".to_string()
        )]
    );
    let saved = h.sink.saved.lock().await;
    assert_eq!(
        saved.as_slice(),
        &[("Biology.apkg".to_string(), b"apkg-bytes".to_vec())]
    );
}

#[tokio::test]
async fn packaging_failure_keeps_collection() {
    let mut h = harness(
        TestExtraction::ok(three_cards()),
        TestPackaging::failing(ServiceError::status(Operation::Packaging, 500, None)),
        RecordingSink::default(),
    );
    h.controller.select_file(pdf_of_size(64)).await;
    h.controller.edit_card(0, CardField::Front, "What is ATP?");
    let before = h.controller.session().cards().to_vec();

    h.controller.download().await;

    let session = h.controller.session();
    assert_eq!(session.state(), StateTag::Preview);
    assert_eq!(session.error(), Some("Download failed (500)"));
    assert_eq!(session.cards(), before.as_slice());
    assert!(h.sink.saved.lock().await.is_empty());
}

#[tokio::test]
async fn sink_failure_is_reported_and_recoverable() {
    let mut h = harness(
        TestExtraction::ok(three_cards()),
        TestPackaging::ok(b"deck"),
        RecordingSink::failing("read-only file system"),
    );
    h.controller.select_file(pdf_of_size(64)).await;
    h.controller.download().await;

    let session = h.controller.session();
    assert_eq!(session.state(), StateTag::Preview);
    assert_eq!(
        session.error(),
        Some("Failed to save deck: read-only file system")
    );
    assert_eq!(session.card_count(), 3);
}

#[tokio::test]
async fn download_with_zero_cards_is_ignored() {
    let mut h = harness(
        TestExtraction::ok(Vec::new()),
        TestPackaging::ok(b"deck"),
        RecordingSink::default(),
    );
    h.controller.select_file(pdf_of_size(64)).await;
    assert_eq!(h.controller.session().state(), StateTag::Preview);

    assert_eq!(h.controller.download().await, Dispatch::Ignored);
    assert!(h.packaging.requests.lock().await.is_empty());
}

#[tokio::test]
async fn edits_before_upload_are_ignored() {
    let mut h = harness(
        TestExtraction::ok(three_cards()),
        TestPackaging::ok(b"deck"),
        RecordingSink::default(),
    );
    assert_eq!(h.controller.delete_card(0), Dispatch::Ignored);
    assert_eq!(h.controller.toggle_edit(0), Dispatch::Ignored);
    assert_eq!(h.controller.rename_deck("x"), Dispatch::Ignored);
    assert_eq!(
        h.controller.edit_card(0, CardField::Back, "x"),
        Dispatch::Ignored
    );
    assert_eq!(h.controller.download().await, Dispatch::Ignored);
    assert_eq!(h.controller.session().state(), StateTag::Idle);
}

#[tokio::test]
async fn toggle_edit_keeps_a_single_focus() {
    let mut h = harness(
        TestExtraction::ok(three_cards()),
        TestPackaging::ok(b"deck"),
        RecordingSink::default(),
    );
    h.controller.select_file(pdf_of_size(64)).await;

    h.controller.toggle_edit(0);
    h.controller.toggle_edit(2);
    assert_eq!(h.controller.session().edit_focus(), Some(2));
    h.controller.toggle_edit(2);
    assert_eq!(h.controller.session().edit_focus(), None);
}

#[tokio::test]
async fn reset_allows_a_fresh_upload() {
    let mut h = harness(
        TestExtraction::ok(three_cards()),
        TestPackaging::ok(b"deck"),
        RecordingSink::default(),
    );
    h.controller.select_file(pdf_of_size(64)).await;
    h.controller.rename_deck("Chemistry");
    h.controller.toggle_edit(1);

    assert_eq!(h.controller.reset(), Dispatch::Applied);
    let session = h.controller.session();
    assert_eq!(session.state(), StateTag::Idle);
    assert_eq!(session.card_count(), 0);
    assert_eq!(session.edit_focus(), None);
    assert_eq!(session.deck_name(), "My Deck");

    h.controller.select_file(pdf_of_size(64)).await;
    assert_eq!(h.controller.session().card_count(), 3);
    assert_eq!(h.extraction.calls(), 2);
}

#[tokio::test]
async fn cancelling_upload_reverts_to_idle() {
    let mut h = harness(
        TestExtraction::ok(three_cards()).slow(Duration::from_secs(30)),
        TestPackaging::ok(b"deck"),
        RecordingSink::default(),
    );
    let cancel = h.controller.cancel_handle();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
    });

    let dispatch = tokio::time::timeout(
        Duration::from_secs(5),
        h.controller.select_file(pdf_of_size(64)),
    )
    .await
    .expect("cancel should end the request");
    assert_eq!(dispatch, Dispatch::Applied);

    let session = h.controller.session();
    assert_eq!(session.state(), StateTag::Idle);
    assert_eq!(session.error(), None);
    assert_eq!(session.card_count(), 0);
}

#[tokio::test]
async fn cancelling_generation_keeps_preview_and_saves_nothing() {
    let mut h = harness(
        TestExtraction::ok(three_cards()),
        TestPackaging::ok(b"deck").slow(Duration::from_secs(30)),
        RecordingSink::default(),
    );
    h.controller.select_file(pdf_of_size(64)).await;
    h.controller.rename_deck("Biology");
    let before = h.controller.session().clone();

    let cancel = h.controller.cancel_handle();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
    });
    tokio::time::timeout(Duration::from_secs(5), h.controller.download())
        .await
        .expect("cancel should end the request");

    assert_eq!(h.controller.session(), &before);
    assert!(h.sink.saved.lock().await.is_empty());
}

#[tokio::test]
async fn cancel_without_a_request_is_not_remembered() {
    let mut h = harness(
        TestExtraction::ok(three_cards()),
        TestPackaging::ok(b"deck"),
        RecordingSink::default(),
    );
    h.controller.cancel_handle().cancel();

    h.controller.select_file(pdf_of_size(64)).await;
    assert_eq!(h.controller.session().state(), StateTag::Preview);
    assert_eq!(h.controller.session().card_count(), 3);
}
