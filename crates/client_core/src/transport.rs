use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{
    header::CONTENT_TYPE,
    multipart::{Form, Part},
    Client, Response,
};
use shared::{
    domain::Card,
    error::ApiErrorBody,
    protocol::{
        ExtractResponse, GenerateRequest, HealthResponse, GENERATE_PATH, HEALTH_PATH,
        PDF_MIME_TYPE, PDF_UPLOAD_FIELD, PDF_UPLOAD_PATH,
    },
};
use tracing::{info, warn};

use crate::{
    config::ClientSettings,
    error::{Operation, ServiceError},
    validation::PdfUpload,
};

/// A packaged deck as returned by the packaging service.
#[derive(Clone, PartialEq, Eq)]
pub struct DeckArtifact {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

impl DeckArtifact {
    pub fn new(bytes: impl Into<Vec<u8>>, content_type: Option<String>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl std::fmt::Debug for DeckArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeckArtifact")
            .field("len", &self.bytes.len())
            .field("content_type", &self.content_type)
            .finish()
    }
}

#[async_trait]
pub trait ExtractionService: Send + Sync {
    async fn extract(&self, upload: &PdfUpload) -> Result<Vec<Card>, ServiceError>;
}

#[async_trait]
pub trait PackagingService: Send + Sync {
    async fn package(&self, cards: &[Card], deck_name: &str)
        -> Result<DeckArtifact, ServiceError>;
}

/// Both services reached over HTTP at one base URL.
pub struct HttpDeckServices {
    http: Client,
    base_url: String,
}

impl HttpDeckServices {
    /// `base_url` is used as a prefix; a trailing slash is dropped.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    pub fn from_settings(settings: &ClientSettings) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .context("failed to build http client")?;
        Ok(Self::with_client(http, settings.api_base_url.clone()))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub async fn health(&self) -> anyhow::Result<HealthResponse> {
        let response: HealthResponse = self
            .http
            .get(self.endpoint(HEALTH_PATH))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        if !response.is_ok() {
            anyhow::bail!("service reported status '{}'", response.status);
        }
        Ok(response)
    }
}

#[async_trait]
impl ExtractionService for HttpDeckServices {
    async fn extract(&self, upload: &PdfUpload) -> Result<Vec<Card>, ServiceError> {
        let op = Operation::Extraction;
        let part = Part::bytes(upload.bytes.clone())
            .file_name(upload.file_name.clone())
            .mime_str(PDF_MIME_TYPE)
            .map_err(|err| ServiceError::transport(op, err.to_string()))?;
        let form = Form::new().part(PDF_UPLOAD_FIELD, part);

        info!(
            file_name = %upload.file_name,
            size_bytes = upload.size_bytes(),
            "extraction: submitting pdf"
        );
        let response = self
            .http
            .post(self.endpoint(PDF_UPLOAD_PATH))
            .multipart(form)
            .send()
            .await
            .map_err(|err| transport_error(op, err))?;
        let response = ensure_success(response, op).await?;
        let body = response
            .bytes()
            .await
            .map_err(|err| transport_error(op, err))?;
        let parsed: ExtractResponse = serde_json::from_slice(&body).map_err(|err| {
            warn!(error = %err, "extraction: response did not match contract");
            ServiceError::invalid_response(op, err.to_string())
        })?;

        info!(card_count = parsed.cards.len(), "extraction: cards received");
        Ok(parsed.cards)
    }
}

#[async_trait]
impl PackagingService for HttpDeckServices {
    async fn package(
        &self,
        cards: &[Card],
        deck_name: &str,
    ) -> Result<DeckArtifact, ServiceError> {
        let op = Operation::Packaging;
        let request = GenerateRequest {
            cards: cards.to_vec(),
            deck_name: deck_name.to_string(),
        };

        info!(card_count = cards.len(), deck_name, "packaging: requesting deck");
        let response = self
            .http
            .post(self.endpoint(GENERATE_PATH))
            .json(&request)
            .send()
            .await
            .map_err(|err| transport_error(op, err))?;
        let response = ensure_success(response, op).await?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = response
            .bytes()
            .await
            .map_err(|err| transport_error(op, err))?;
        if bytes.is_empty() {
            warn!("packaging: service returned an empty artifact");
            return Err(ServiceError::invalid_response(op, "empty deck artifact"));
        }

        info!(size_bytes = bytes.len(), "packaging: deck received");
        Ok(DeckArtifact::new(bytes.to_vec(), content_type))
    }
}

fn transport_error(op: Operation, err: reqwest::Error) -> ServiceError {
    warn!(operation = ?op, error = %err, "request failed without a response");
    ServiceError::transport(op, err.to_string())
}

async fn ensure_success(response: Response, op: Operation) -> Result<Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.bytes().await.unwrap_or_default();
    let detail = ApiErrorBody::detail_from_bytes(&body);
    warn!(
        operation = ?op,
        status = status.as_u16(),
        detail = detail.as_deref().unwrap_or_default(),
        "service returned an error status"
    );
    Err(ServiceError::status(op, status.as_u16(), detail))
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
