//! Session lifecycle: the per-title state, the phase machine that owns it,
//! and the snapshot published to callers.

mod lifecycle;
mod state;

pub use lifecycle::Collaborators;
pub(crate) use lifecycle::{SessionLifecycle, SessionUpdate};
pub use state::{OpenRequest, PlaybackSession, PlaybackSnapshot, SessionPhase};
