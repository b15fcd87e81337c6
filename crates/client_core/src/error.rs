use thiserror::Error;

/// Client-side pre-flight rejections. These never reach the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please upload a PDF file.")]
    NotPdf { mime_type: Option<String> },
    #[error("File exceeds 20 MB limit.")]
    TooLarge { size_bytes: u64, limit_bytes: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Extraction,
    Packaging,
}

impl Operation {
    fn failure_prefix(self) -> &'static str {
        match self {
            Operation::Extraction => "Upload failed",
            Operation::Packaging => "Download failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceFailure {
    /// The service answered with a non-2xx status.
    Status { code: u16, detail: Option<String> },
    /// No response at all (connect error, timeout, reset).
    Transport(String),
    /// A 2xx answer whose body did not match the contract.
    InvalidResponse(String),
}

/// A failed call to the extraction or packaging service.
///
/// `Display` yields the message surfaced to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", self.user_message())]
pub struct ServiceError {
    pub operation: Operation,
    pub failure: ServiceFailure,
}

impl ServiceError {
    pub fn status(operation: Operation, code: u16, detail: Option<String>) -> Self {
        Self {
            operation,
            failure: ServiceFailure::Status { code, detail },
        }
    }

    pub fn transport(operation: Operation, reason: impl Into<String>) -> Self {
        Self {
            operation,
            failure: ServiceFailure::Transport(reason.into()),
        }
    }

    pub fn invalid_response(operation: Operation, reason: impl Into<String>) -> Self {
        Self {
            operation,
            failure: ServiceFailure::InvalidResponse(reason.into()),
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match &self.failure {
            ServiceFailure::Status { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn user_message(&self) -> String {
        let prefix = self.operation.failure_prefix();
        match &self.failure {
            ServiceFailure::Status {
                detail: Some(detail),
                ..
            } => detail.clone(),
            ServiceFailure::Status { code, detail: None } => format!("{prefix} ({code})"),
            ServiceFailure::Transport(_) => prefix.to_string(),
            ServiceFailure::InvalidResponse(_) => format!("{prefix} (invalid response)"),
        }
    }
}
