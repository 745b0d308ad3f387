//! Error types for the TRS client.
//!
//! # Design
//! Every failure surfaces to the caller unchanged; the client never retries
//! or recovers. Non-2xx responses land in `Api` with the raw status code and
//! body. The TRS `Error` model can be decoded from that body on demand via
//! [`TrsError::error_response`].

use std::fmt;

use crate::types::ErrorResponse;

/// A single schema violation found in a response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// JSON pointer to the offending field, e.g. `/versions/0/url`.
    /// Empty for the document root.
    pub path: String,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "(root): {}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Errors returned by `TrsClient` and its helpers.
#[derive(Debug, thiserror::Error)]
pub enum TrsError {
    /// The URI or hostname given to the client could not be resolved.
    #[error("invalid URI '{0}'")]
    InvalidUri(String),

    /// A tool or version identifier could not be parsed.
    #[error("invalid resource identifier: {0}")]
    InvalidResourceIdentifier(String),

    /// A path template placeholder had no value.
    #[error("missing required parameter '{0}'")]
    MissingParameter(String),

    /// The endpoint does not offer the requested `Accept` type.
    #[error("content type '{requested}' not provided by the service (available: {})", available.join(", "))]
    ContentTypeUnavailable {
        requested: String,
        available: Vec<String>,
    },

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The request never produced an HTTP response.
    #[error("could not connect to API endpoint: {0}")]
    Transport(String),

    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Api { status: u16, body: String },

    /// The response does not conform to the endpoint's schema.
    #[error("response could not be validated against API schema: {}", join_violations(violations))]
    Validation { violations: Vec<Violation> },

    /// `retrieve_files` could not determine what to write.
    #[error("file information unavailable: {0}")]
    FileInformationUnavailable(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TrsError {
    /// Decode the TRS `Error` model from an `Api` error body, if possible.
    pub fn error_response(&self) -> Option<ErrorResponse> {
        match self {
            TrsError::Api { body, .. } => serde_json::from_str(body).ok(),
            _ => None,
        }
    }

    /// HTTP status for `Api` errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            TrsError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Field paths reported by a `Validation` error.
    pub fn violation_paths(&self) -> Vec<&str> {
        match self {
            TrsError::Validation { violations } => {
                violations.iter().map(|v| v.path.as_str()).collect()
            }
            _ => Vec::new(),
        }
    }
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
