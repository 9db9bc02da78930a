use thiserror::Error;

/// Errors raised by the document model when a position, slice or step
/// cannot be applied to a particular document version.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("Position {pos} out of range (content size {size})")]
    PositionOutOfRange { pos: usize, size: usize },

    #[error("Replace failed: {0}")]
    Replace(String),

    #[error("Invalid content for {node_type}: {reason}")]
    InvalidContent { node_type: String, reason: String },

    #[error("No node at position {0}")]
    NoNodeAt(usize),

    #[error("Step failed: {0}")]
    StepFailed(String),

    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    #[error("Unknown mark type: {0}")]
    UnknownMarkType(String),

    #[error("Invalid mark attributes for {mark}: {reason}")]
    InvalidMark { mark: String, reason: String },

    #[error("Malformed JSON: {0}")]
    Json(String),
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::Json(err.to_string())
    }
}
