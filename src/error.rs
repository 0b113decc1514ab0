use thiserror::Error;

/// Failures raised by the drift-detection pipeline.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DriftError {
    #[error("invalid version {version:?}: {reason}")]
    InvalidVersion { version: String, reason: String },
}

impl DriftError {
    pub fn invalid_version(version: &str, reason: impl ToString) -> Self {
        Self::InvalidVersion {
            version: version.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Rejected request input. The message is returned to the caller verbatim.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("All fields are required")]
    MissingFields,
    #[error("Invalid version: {0}")]
    InvalidVersion(String),
    #[error("{0}")]
    OutOfRange(String),
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing auth header")]
    MissingHeader,
    #[error("{0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
    #[error("signing secret is empty")]
    EmptySecret,
}
