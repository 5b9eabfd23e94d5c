use std::fmt;

use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("{0}")]
    Adapter(#[from] AdapterFailure),

    #[error("All data sources failed: {}", join_failures(.0))]
    SourcesExhausted(Vec<AdapterFailure>),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Argument validation failure. Always names the offending field.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("arguments must be a JSON object, got {0}")]
    NotAnObject(String),

    #[error("missing required parameter '{field}'")]
    Missing { field: String },

    #[error("invalid value for '{field}': expected {expected}, got {actual}")]
    TypeMismatch {
        field: String,
        expected: String,
        actual: Value,
    },

    #[error("invalid value for '{field}': expected one of [{}], got {actual}", .allowed.join(", "))]
    NotAllowed {
        field: String,
        allowed: Vec<String>,
        actual: Value,
    },
}

impl ValidationError {
    pub fn field(&self) -> Option<&str> {
        match self {
            ValidationError::NotAnObject(_) => None,
            ValidationError::Missing { field }
            | ValidationError::TypeMismatch { field, .. }
            | ValidationError::NotAllowed { field, .. } => Some(field),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Connection, DNS or body read error.
    Network,
    /// Upstream answered with a non-2xx status.
    Status,
    Timeout,
    /// Child process could not be spawned or exited non-zero.
    Process,
    EmptyOutput,
    Parse,
    /// Upstream answered but carried nothing usable.
    NoData,
}

/// Failed data-source call. Never carries a partial payload.
#[derive(Debug, Clone, PartialEq)]
pub struct AdapterFailure {
    pub kind: FailureKind,
    pub message: String,
    pub status: Option<u16>,
}

impl AdapterFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Network, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Timeout, message)
    }

    pub fn process(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Process, message)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Parse, message)
    }

    pub fn no_data(message: impl Into<String>) -> Self {
        Self::new(FailureKind::NoData, message)
    }
}

impl fmt::Display for AdapterFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} (HTTP {})", self.message, status),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for AdapterFailure {}

/// Failure messages in call order, joined with `; `.
pub fn join_failures(failures: &[AdapterFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
