//! Error types for the Strata client

use strata_core::dto::error::{ErrorBody, ErrorKind};
use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when using the Strata client
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// API returned an error status code
    ///
    /// `code` is absent when the body was not a registry error, e.g. a
    /// rejection from a proxy.
    #[error("API error (status {status}): {message}")]
    Api {
        status: u16,
        code: Option<ErrorKind>,
        message: String,
    },

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

impl ClientError {
    /// Build an API error from a failed response's status and body
    pub fn from_response(status: u16, body: &str) -> Self {
        match serde_json::from_str::<ErrorBody>(body) {
            Ok(err) => Self::Api {
                status,
                code: Some(err.code),
                message: err.message,
            },
            Err(_) => Self::Api {
                status,
                code: None,
                message: body.to_string(),
            },
        }
    }

    /// The registry's error kind, if the server sent one
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Api { code, .. } => *code,
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { status: 404, .. })
    }

    /// Check if this error is a client error (4xx status)
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Api { status, .. } if (400..500).contains(status))
    }

    /// Check if this error is a server error (5xx status)
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Api { status, .. } if *status >= 500)
    }
}
