use std::fmt;

use thiserror::Error;

/// Why a single record could not be graded.
///
/// None of these abort a batch; the runner turns each into a report entry.
#[derive(Debug, Error)]
pub enum GradingError {
    #[error("{0}")]
    Fetch(String),

    #[error("{0}")]
    Encode(String),

    #[error("{0}")]
    Transport(String),

    #[error("{0}")]
    Schema(#[from] SchemaViolation),

    #[error("{0}")]
    InvalidRecord(String),
}

impl GradingError {
    /// Short tag used in report lines.
    pub fn kind(&self) -> &'static str {
        match self {
            GradingError::Fetch(_) => "FetchError",
            GradingError::Encode(_) => "EncodeError",
            GradingError::Transport(_) => "TransportError",
            GradingError::Schema(_) => "SchemaError",
            GradingError::InvalidRecord(_) => "RecordError",
        }
    }
}

impl From<ai_client::AiError> for GradingError {
    fn from(e: ai_client::AiError) -> Self {
        GradingError::Transport(e.to_string())
    }
}

/// A grading response that does not match the score document layout.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind} at `{path}`")]
pub struct SchemaViolation {
    /// Dotted path of the offending field, `$` for the document root.
    pub path: String,
    pub kind: ViolationKind,
}

impl SchemaViolation {
    pub fn new(path: impl Into<String>, kind: ViolationKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViolationKind {
    NotJson(String),
    NotAnObject,
    MissingField,
    NotNumeric,
    OutOfRange(f64),
    Malformed(String),
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationKind::NotJson(e) => write!(f, "response is not JSON ({e})"),
            ViolationKind::NotAnObject => write!(f, "expected an object"),
            ViolationKind::MissingField => write!(f, "missing required field"),
            ViolationKind::NotNumeric => write!(f, "score is not a number"),
            ViolationKind::OutOfRange(v) => write!(f, "score {v} outside 0-10"),
            ViolationKind::Malformed(e) => write!(f, "malformed field ({e})"),
        }
    }
}
