//! Result of a successful call: a validated model or the raw body.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{TrsError, Violation};

/// Body returned without schema validation.
#[derive(Debug, Clone, PartialEq)]
pub enum RawBody {
    Json(Value),
    /// Non-JSON content, e.g. `text/plain` descriptors or zip archives.
    Bytes(Vec<u8>),
}

/// `Structured` when the body was validated and decoded, `Raw` when
/// validation is switched off or the content is not JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum TrsResponse<T> {
    Structured(T),
    Raw(RawBody),
}

impl<T> TrsResponse<T> {
    pub fn is_structured(&self) -> bool {
        matches!(self, TrsResponse::Structured(_))
    }

    pub fn structured(self) -> Option<T> {
        match self {
            TrsResponse::Structured(v) => Some(v),
            TrsResponse::Raw(_) => None,
        }
    }

    pub fn raw(&self) -> Option<&RawBody> {
        match self {
            TrsResponse::Structured(_) => None,
            TrsResponse::Raw(raw) => Some(raw),
        }
    }
}

impl<T: DeserializeOwned> TrsResponse<T> {
    /// Decode into `T` regardless of how the body came back. Raw JSON is
    /// deserialized without schema validation.
    pub fn into_typed(self) -> Result<T, TrsError> {
        match self {
            TrsResponse::Structured(v) => Ok(v),
            TrsResponse::Raw(RawBody::Json(value)) => decode(value),
            TrsResponse::Raw(RawBody::Bytes(_)) => Err(TrsError::Validation {
                violations: vec![Violation {
                    path: String::new(),
                    message: "body is not JSON".to_string(),
                }],
            }),
        }
    }
}

pub(crate) fn decode<T: DeserializeOwned>(value: Value) -> Result<T, TrsError> {
    serde_json::from_value(value).map_err(|e| TrsError::Validation {
        violations: vec![Violation {
            path: String::new(),
            message: e.to_string(),
        }],
    })
}
