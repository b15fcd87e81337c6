use serde::{Deserialize, Serialize};

/// Error body the extraction and packaging services may attach to a
/// non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub detail: String,
}

impl ApiErrorBody {
    /// Returns the detail message if `body` is a JSON error body with a
    /// non-blank `detail` string.
    pub fn detail_from_bytes(body: &[u8]) -> Option<String> {
        let parsed: Self = serde_json::from_slice(body).ok()?;
        let detail = parsed.detail.trim();
        if detail.is_empty() {
            None
        } else {
            Some(detail.to_string())
        }
    }
}
