use serde_json::Value;
use thiserror::Error;

use crate::path::JsonPath;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    /// The wire text is not JSON at all; nothing was validated.
    #[error("malformed JSON input: {0}")]
    MalformedInput(#[source] serde_json::Error),

    #[error("cannot render JSON output: {0}")]
    Output(#[source] serde_json::Error),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The validated value did not fit the requested Rust type.
    #[error("at JSON path {path} → {message}")]
    Typed { path: String, message: String },
}

/// Defects in the schema itself, never in the data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("unknown schema `{name}`")]
    UnknownSchema { name: String },

    #[error("schema `{name}` is already defined")]
    DuplicateSchema { name: String },

    #[error("invalid schema document at {path}: {reason}")]
    InvalidDocument { path: String, reason: String },
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("invalid value at {path}: {kind}")]
pub struct ValidationError {
    pub path: JsonPath,
    pub kind: ValidationErrorKind,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationErrorKind {
    #[error("expected {expected} but got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("{actual} is not one of {}", render_list(.allowed))]
    EnumViolation { allowed: Vec<Value>, actual: String },

    #[error("cannot read {actual} as a date")]
    DateParseFailure { actual: String },

    #[error("{actual} matches none of {}", .members.join(", "))]
    UnionExhausted { members: Vec<String>, actual: String },

    #[error("unexpected field \"{key}\"")]
    UnexpectedField { key: String },
}

fn render_list(values: &[Value]) -> String {
    let xs = values.iter().map(Value::to_string).collect::<Vec<_>>();
    format!("[{}]", xs.join(", "))
}

impl Error {
    pub fn is_validation(&self) -> bool { matches!(self, Error::Validation(_)) }
    pub fn is_schema(&self) -> bool { matches!(self, Error::Schema(_)) }

    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            Error::Validation(e) => Some(e),
            _ => None,
        }
    }
}

impl ValidationError {
    pub fn new(path: JsonPath, kind: ValidationErrorKind) -> Self {
        Self { path, kind }
    }
}
