//! Error types for balena-event-log

use thiserror::Error;

/// Errors that can occur while tracking events
#[derive(Debug, Error)]
pub enum EventLogError {
    /// Malformed user record or missing construction options
    #[error("{0}")]
    Validation(String),

    /// Failure inside an adaptor (login, logout, track, ...)
    #[error("Adaptor '{adaptor}' failed: {reason}")]
    Adaptor {
        adaptor: String,
        reason: String,
    },

    /// HTTP transport failure
    #[error("HTTP error: {0}")]
    Http(String),

    /// Analytics backend rejected a request
    #[error("Backend returned {status}: {message}")]
    Api {
        status: u16,
        message: String,
    },

    /// User-supplied hook failed
    #[error("Hook error: {0}")]
    Hook(String),

    /// `before_create` hook explicitly aborted the event
    #[error("Event aborted: {0}")]
    Aborted(String),

    /// Namespace/action pair is not part of the event taxonomy
    #[error("Unknown event '{namespace}.{action}'")]
    UnknownEvent {
        namespace: String,
        action: String,
    },

    /// Serialization/deserialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EventLogError {
    /// Wrap any error as an adaptor failure
    pub fn adaptor(adaptor: impl Into<String>, reason: impl ToString) -> Self {
        Self::Adaptor {
            adaptor: adaptor.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<reqwest::Error> for EventLogError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e.to_string())
    }
}

/// Result type alias for event log operations
pub type Result<T> = std::result::Result<T, EventLogError>;
