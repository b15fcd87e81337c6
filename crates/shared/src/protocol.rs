use serde::{Deserialize, Serialize};

use crate::domain::{Card, DEFAULT_DECK_NAME};

pub const PDF_UPLOAD_PATH: &str = "/api/pdf-upload";
pub const GENERATE_PATH: &str = "/api/generate";
pub const HEALTH_PATH: &str = "/api/health";

/// Multipart field carrying the PDF bytes.
pub const PDF_UPLOAD_FIELD: &str = "file";
pub const PDF_MIME_TYPE: &str = "application/pdf";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractResponse {
    pub cards: Vec<Card>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub cards: Vec<Card>,
    #[serde(default = "default_deck_name")]
    pub deck_name: String,
}

fn default_deck_name() -> String {
    DEFAULT_DECK_NAME.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("ok")
    }
}
