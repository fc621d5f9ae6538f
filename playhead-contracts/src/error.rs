use thiserror::Error;

/// Failure reported by a remote collaborator (media server or
/// watch-history service).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("remote unreachable: {0}")]
    Unreachable(String),

    #[error("remote returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("not authenticated")]
    Unauthenticated,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("no playable representation: {0}")]
    NotPlayable(String),

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("request timed out")]
    Timeout,
}

impl RemoteError {
    /// True when the failure says something about the item rather than the
    /// transport.
    pub fn is_content_problem(&self) -> bool {
        matches!(self, RemoteError::NotFound(_) | RemoteError::NotPlayable(_))
    }
}

pub type RemoteResult<T> = std::result::Result<T, RemoteError>;
