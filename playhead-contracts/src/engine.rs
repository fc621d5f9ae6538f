//! Video engine capability surface.
//!
//! Platform backends implement [`VideoEngine`]; the orchestrator never
//! branches on which backend is in use. Engine callbacks are delivered as a
//! single typed stream of [`EngineEvent`]s through the [`EngineEventSender`]
//! handed over in [`VideoEngine::load`].

use thiserror::Error;
use tokio::sync::mpsc;
use url::Url;

/// Callback emitted by the video engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Loaded {
        duration_ms: u64,
    },
    Progress {
        position_ms: u64,
        duration_ms: u64,
        is_playing: bool,
    },
    Buffering(bool),
    SeekCompleted {
        position_ms: u64,
    },
    Ended,
    Error {
        message: String,
    },
}

/// Engine event stamped with the session generation it was produced for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEngineEvent {
    pub generation: u64,
    pub event: EngineEvent,
}

/// Per-session event sink handed to the engine.
///
/// Every event carries the generation of the session that loaded the
/// engine, so callbacks that arrive after that session was retired can be
/// recognised and dropped.
#[derive(Debug, Clone)]
pub struct EngineEventSender {
    generation: u64,
    tx: mpsc::UnboundedSender<SessionEngineEvent>,
}

impl EngineEventSender {
    pub fn new(
        generation: u64,
        tx: mpsc::UnboundedSender<SessionEngineEvent>,
    ) -> Self {
        Self { generation, tx }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns `false` once the orchestrator has gone away.
    pub fn emit(&self, event: EngineEvent) -> bool {
        self.tx
            .send(SessionEngineEvent {
                generation: self.generation,
                event,
            })
            .is_ok()
    }
}

/// The engine refused a command outright (e.g. unsupported URL).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("video engine fault: {0}")]
pub struct EngineFault(pub String);

/// Commands accepted by the video engine.
#[cfg_attr(feature = "mocks", mockall::automock)]
pub trait VideoEngine: Send + Sync {
    /// Start loading `endpoint`; callbacks flow through `events`.
    fn load(
        &self,
        endpoint: &Url,
        events: EngineEventSender,
    ) -> Result<(), EngineFault>;

    fn seek(&self, position_ms: u64);

    fn set_paused(&self, paused: bool);

    /// Release the current media. Safe to call when nothing is loaded.
    fn unload(&self);
}
