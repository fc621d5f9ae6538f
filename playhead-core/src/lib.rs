//! Playback session orchestration: stream resolution, timeline sync,
//! watch-history scrobbling, marker lookup and next-up auto-advance, all
//! owned by one session lifecycle state machine.
#![allow(missing_docs)]

pub mod error;
pub mod markers;
pub mod next_up;
pub mod orchestrator;
pub mod resolver;
pub mod scrobble;
pub mod session;
pub mod timeline;

pub use error::{
    EngineError, PlaybackError, ReportError, ResolutionError, TeardownError,
    TeardownStep,
};
pub use next_up::{EndSignal, NextUpController, NextUpEvaluation};
pub use orchestrator::{OrchestratorHandle, PlaybackOrchestrator};
pub use resolver::StreamResolver;
pub use scrobble::{ScrobbleCoordinator, ScrobbleDrain, ScrobbleVerb};
pub use session::{
    Collaborators, OpenRequest, PlaybackSession, PlaybackSnapshot,
    SessionPhase,
};
pub use timeline::TimelineReporter;
