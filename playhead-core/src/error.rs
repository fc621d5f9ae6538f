use std::fmt;

use playhead_contracts::prelude::{EngineFault, RemoteError};
use playhead_model::ContentId;
use thiserror::Error;

use crate::scrobble::ScrobbleVerb;

/// The content cannot be turned into a playable stream. Fatal for the
/// session, surfaced to the caller, never retried automatically.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("no playable representation for {content_id}: {reason}")]
    NotPlayable { content_id: ContentId, reason: String },

    #[error("media server unreachable while resolving {content_id}: {source}")]
    Unreachable {
        content_id: ContentId,
        #[source]
        source: RemoteError,
    },
}

impl ResolutionError {
    pub fn from_remote(content_id: ContentId, err: RemoteError) -> Self {
        if err.is_content_problem() {
            ResolutionError::NotPlayable {
                content_id,
                reason: err.to_string(),
            }
        } else {
            ResolutionError::Unreachable {
                content_id,
                source: err,
            }
        }
    }
}

/// A timeline or scrobble call failed. Logged and swallowed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReportError {
    #[error("timeline report failed: {0}")]
    Timeline(#[source] RemoteError),

    #[error("scrobble {verb} failed: {source}")]
    Scrobble {
        verb: ScrobbleVerb,
        #[source]
        source: RemoteError,
    },
}

/// The video engine failed to decode or fetch the stream. Fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("playback failed: {0}")]
    Playback(String),

    #[error(transparent)]
    Load(#[from] EngineFault),
}

/// Ordered teardown steps run when a session closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TeardownStep {
    ScrobbleStop,
    TimelineStop,
    SessionStop,
    CancelTimers,
}

impl fmt::Display for TeardownStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TeardownStep::ScrobbleStop => "scrobble-stop",
            TeardownStep::TimelineStop => "timeline-stop",
            TeardownStep::SessionStop => "session-stop",
            TeardownStep::CancelTimers => "cancel-timers",
        };
        f.write_str(name)
    }
}

/// A cleanup step failed. Logged; never blocks the remaining steps.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TeardownError {
    #[error("teardown step {step} failed: {source}")]
    Remote {
        step: TeardownStep,
        #[source]
        source: RemoteError,
    },

    #[error("teardown step {step} timed out after {timeout_ms}ms")]
    TimedOut { step: TeardownStep, timeout_ms: u64 },

    #[error("teardown step {step} worker aborted: {message}")]
    Aborted { step: TeardownStep, message: String },
}

/// Errors a caller of the orchestrator can observe.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("session was retired before it finished opening")]
    Cancelled,

    #[error("playback orchestrator is no longer running")]
    OrchestratorStopped,
}

impl PlaybackError {
    /// Errors rendered with a retry/back affordance.
    pub fn is_user_visible(&self) -> bool {
        matches!(self, PlaybackError::Resolution(_) | PlaybackError::Engine(_))
    }
}

pub type Result<T> = std::result::Result<T, PlaybackError>;
