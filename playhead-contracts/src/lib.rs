//! Trait surfaces that describe the collaborators a playback session talks
//! to: the remote media server, the watch-history service, the video engine
//! and the host platform.

pub mod engine;
pub mod error;
pub mod media_server;
pub mod platform;
pub mod watch_history;

/// Frequently used trait combinators for orchestration crates.
pub mod prelude {
    pub use super::engine::{
        EngineEvent, EngineEventSender, EngineFault, SessionEngineEvent,
        VideoEngine,
    };
    pub use super::error::{RemoteError, RemoteResult};
    pub use super::media_server::{MediaServer, TimelineUpdate};
    pub use super::platform::{NoopPlatform, PlatformSession};
    pub use super::watch_history::{NoopWatchHistory, WatchHistory};
}
