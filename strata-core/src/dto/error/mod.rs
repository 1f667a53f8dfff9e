//! Error DTOs
//!
//! Machine-readable error kinds returned alongside a human-readable message.

use serde::{Deserialize, Serialize};

/// Category of a failed registry operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidArgument,
    MalformedDefinition,
    DuplicatedName,
    AccessDenied,
    NotFound,
    InvalidMarker,
    ActionNotAllowed,
    InternalError,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::InvalidArgument => "InvalidArgument",
            ErrorKind::MalformedDefinition => "MalformedDefinition",
            ErrorKind::DuplicatedName => "DuplicatedName",
            ErrorKind::AccessDenied => "AccessDenied",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::InvalidMarker => "InvalidMarker",
            ErrorKind::ActionNotAllowed => "ActionNotAllowed",
            ErrorKind::InternalError => "InternalError",
        };
        f.write_str(name)
    }
}

/// Body of every non-2xx API response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: ErrorKind,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_body_wire_format() {
        let body = ErrorBody {
            code: ErrorKind::DuplicatedName,
            message: "already exists".to_string(),
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["code"], "DuplicatedName");
        assert_eq!(json["code"], body.code.to_string());
    }
}
