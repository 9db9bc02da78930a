use redline_model::ModelError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The host schema lacks one of the suggestion mark types.
    #[error("Schema is missing the `{0}` annotation type")]
    SchemaMissingAnnotation(String),

    /// A step cannot be applied to the current document.
    #[error("Invalid operation: {0}")]
    InvalidOperation(#[from] ModelError),

    /// A position fell outside the document after rebasing or mapping.
    #[error("Position {0} does not resolve in the current document")]
    UnresolvedReference(usize),
}

pub type Result<T> = std::result::Result<T, EngineError>;
