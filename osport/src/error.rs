//! Error types for osport.

use thiserror::Error;

/// Failure reported by the cloud while looking up or mutating a port.
///
/// The message is whatever the cloud said, unchanged. It is what ends up in
/// the `msg` field of the failure payload.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct CloudError {
    pub message: String,
    /// HTTP status of the failing response, if there was one.
    pub status: Option<u16>,
}

impl CloudError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(message: impl Into<String>, status: u16) -> Self {
        Self {
            message: message.into(),
            status: Some(status),
        }
    }
}

impl From<reqwest::Error> for CloudError {
    fn from(e: reqwest::Error) -> Self {
        Self {
            message: e.to_string(),
            status: e.status().map(|s| s.as_u16()),
        }
    }
}

/// Errors that can occur while reconciling a port.
#[derive(Debug, Error)]
pub enum Error {
    /// Neither `port_id` nor `name` was given.
    #[error("one of the following is required: port_id, name")]
    MissingIdentity,

    /// Invalid or unreadable configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The cloud binding could not be set up.
    #[error("cloud setup failed: {0}")]
    Setup(String),

    /// The cloud rejected a call.
    #[error(transparent)]
    Cloud(#[from] CloudError),
}

impl Error {
    /// Whether the error was raised before the cloud was contacted.
    pub fn is_config(&self) -> bool {
        matches!(self, Error::MissingIdentity | Error::Config(_))
    }
}

/// Result type for osport operations.
pub type Result<T> = std::result::Result<T, Error>;
