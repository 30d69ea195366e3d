//! Error type for backend round trips.
//! Timetable commits and booking actions return `ClientError`; disk-only
//! services (settings, database setup, PDF) stay on `anyhow`.

use thiserror::Error;

use crate::models::booking::{sanitization_message, FieldError};

/// A refusal reported by the server for a well-formed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusinessError {
    /// Plugin or server logic refused the request
    Rejected { origin: String, message: String },
    /// The server refused fields containing markup
    Sanitization { invalid_fields: Vec<String> },
}

impl BusinessError {
    pub fn rejected(origin: impl Into<String>, message: impl Into<String>) -> Self {
        BusinessError::Rejected {
            origin: origin.into(),
            message: message.into(),
        }
    }

    /// Field errors to mark in the booking form
    pub fn field_errors(&self) -> Vec<FieldError> {
        match self {
            BusinessError::Sanitization { invalid_fields } => invalid_fields
                .iter()
                .map(|field| FieldError::new(field, sanitization_message(field)))
                .collect(),
            BusinessError::Rejected { .. } => Vec::new(),
        }
    }
}

impl std::fmt::Display for BusinessError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BusinessError::Rejected { origin, message } => write!(f, "{} ({})", message, origin),
            BusinessError::Sanitization { invalid_fields } => {
                write!(f, "Markup is not allowed in: {}", invalid_fields.join(", "))
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum ClientError {
    // ---------------------------
    // Caught before any request
    // ---------------------------
    #[error("Invalid input: {}", .0.iter().map(|e| format!("{}: {}", e.field, e.message)).collect::<Vec<_>>().join("; "))]
    Validation(Vec<FieldError>),

    // ---------------------------
    // Reported by the server
    // ---------------------------
    #[error("Server refused the request: {0}")]
    Business(BusinessError),

    #[error("Not found: {0}")]
    NotFound(String),

    // ---------------------------
    // Transport and decoding
    // ---------------------------
    #[error("Request failed: {0}")]
    Transport(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Local store error: {0}")]
    Storage(#[from] rusqlite::Error),
}

/// How an error reaches the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Inline next to the offending fields
    Validation,
    /// Error popup, optionally through the plugin's handler
    Business,
    /// Generic error report
    Unexpected,
}

impl ClientError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ClientError::Validation(_) => ErrorCategory::Validation,
            ClientError::Business(_) => ErrorCategory::Business,
            _ => ErrorCategory::Unexpected,
        }
    }

    pub fn business(&self) -> Option<&BusinessError> {
        match self {
            ClientError::Business(err) => Some(err),
            _ => None,
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitization_maps_to_field_errors() {
        let err = BusinessError::Sanitization {
            invalid_fields: vec!["roomName".to_string(), "description".to_string()],
        };
        let fields = err.field_errors();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].field, "roomName");
        assert!(fields[1].message.contains("description"));
    }

    #[test]
    fn test_categories() {
        assert_eq!(
            ClientError::Validation(vec![FieldError::new("name", "required")]).category(),
            ErrorCategory::Validation
        );
        assert_eq!(
            ClientError::Business(BusinessError::rejected("start", "busy")).category(),
            ErrorCategory::Business
        );
        assert_eq!(
            ClientError::Transport("timeout".to_string()).category(),
            ErrorCategory::Unexpected
        );
    }

    #[test]
    fn test_validation_message_lists_fields() {
        let err = ClientError::Validation(vec![
            FieldError::new("name", "required"),
            FieldError::new("pin", "must be numeric"),
        ]);
        assert_eq!(err.to_string(), "Invalid input: name: required; pin: must be numeric");
    }
}
