use std::fmt;
use thiserror::Error;

/// Structured body format being compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Json,
    Xml,
}

impl fmt::Display for BodyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BodyKind::Json => f.write_str("JSON"),
            BodyKind::Xml => f.write_str("XML"),
        }
    }
}

/// Which side of a comparison a body came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyOrigin {
    Incoming,
    Recorded,
}

impl fmt::Display for BodyOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BodyOrigin::Incoming => f.write_str("incoming"),
            BodyOrigin::Recorded => f.write_str("recorded"),
        }
    }
}

/// Errors aborting a single match attempt.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MatchError {
    #[error("Malformed {kind} in {origin} request body: {message}")]
    Parse {
        kind: BodyKind,
        origin: BodyOrigin,
        message: String,
    },
    #[error("Invalid field path '{path}': {reason}")]
    FieldPath { path: String, reason: String },
}

impl MatchError {
    pub fn parse(kind: BodyKind, origin: BodyOrigin, message: impl fmt::Display) -> Self {
        MatchError::Parse {
            kind,
            origin,
            message: message.to_string(),
        }
    }

    pub fn field_path(path: impl Into<String>, reason: impl fmt::Display) -> Self {
        MatchError::FieldPath {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
