//! Pre-flight checks run before a PDF is handed to the extraction service.
//!
//! These are advisory; the service validates again on its side.

use shared::protocol::PDF_MIME_TYPE;

use crate::error::ValidationError;

pub const MAX_PDF_BYTES: u64 = 20 * 1024 * 1024;

/// A file the user picked or dropped, as the front end saw it.
#[derive(Clone, PartialEq, Eq)]
pub struct PdfUpload {
    pub file_name: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl PdfUpload {
    pub fn new(
        file_name: impl Into<String>,
        mime_type: Option<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type,
            bytes: bytes.into(),
        }
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_pdf(self.mime_type.as_deref(), self.size_bytes())
    }
}

impl std::fmt::Debug for PdfUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfUpload")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("size_bytes", &self.size_bytes())
            .finish()
    }
}

/// Type is checked before size, so a huge non-PDF reports the type error.
pub fn validate_pdf(mime_type: Option<&str>, size_bytes: u64) -> Result<(), ValidationError> {
    if !is_pdf_mime(mime_type) {
        return Err(ValidationError::NotPdf {
            mime_type: mime_type.map(str::to_string),
        });
    }
    if size_bytes > MAX_PDF_BYTES {
        return Err(ValidationError::TooLarge {
            size_bytes,
            limit_bytes: MAX_PDF_BYTES,
        });
    }
    Ok(())
}

fn is_pdf_mime(mime_type: Option<&str>) -> bool {
    let Some(mime_type) = mime_type else {
        return false;
    };
    let essence = mime_type.split(';').next().unwrap_or_default().trim();
    essence.eq_ignore_ascii_case(PDF_MIME_TYPE)
}
