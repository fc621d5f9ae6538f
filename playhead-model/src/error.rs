use thiserror::Error;

/// Errors produced by model constructors and validation routines.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("invalid marker: {0}")]
    InvalidMarker(String),

    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("invalid stream profile: {0}")]
    InvalidProfile(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
