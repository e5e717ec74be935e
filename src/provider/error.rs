//! # Control-Plane Errors
//!
//! Typed signals returned by every [`super::ControlPlane`] implementation.

use thiserror::Error;

/// Error returned by the Aiven control plane
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AivenError {
    /// The addressed remote resource does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// A create collided with an existing remote resource
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Network failure, timeout, throttling or a 5xx answer
    #[error("transient failure: {0}")]
    Transient(String),

    /// Any other rejected request
    #[error("Aiven API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The response body did not have the expected shape
    #[error("failed to decode Aiven API response: {0}")]
    Decode(String),
}

impl AivenError {
    /// Classify an HTTP error answer
    #[must_use]
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            404 => Self::NotFound(message),
            409 => Self::AlreadyExists(message),
            408 | 429 | 500..=599 => Self::Transient(format!("HTTP {status}: {message}")),
            _ => Self::Api { status, message },
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists(_))
    }

    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// Stable label for metrics
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::AlreadyExists(_) => "already_exists",
            Self::Transient(_) => "transient",
            Self::Api { .. } => "api",
            Self::Decode(_) => "decode",
        }
    }

    /// Message text without the classification prefix
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::NotFound(m) | Self::AlreadyExists(m) | Self::Transient(m) | Self::Decode(m) => m,
            Self::Api { message, .. } => message,
        }
    }
}

impl From<reqwest::Error> for AivenError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            return Self::Decode(error.to_string());
        }
        match error.status() {
            Some(status) => Self::from_status(status.as_u16(), error.to_string()),
            // Connect, timeout and body errors carry no status
            None => Self::Transient(error.to_string()),
        }
    }
}
