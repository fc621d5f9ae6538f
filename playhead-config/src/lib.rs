//! Configuration library for Playhead.
//!
//! Centralizes defaults, file/env loading and validation for everything the
//! playback orchestrator and its HTTP adapters can be tuned with.

pub mod loader;
pub mod models;
pub mod util;
pub mod validation;

pub use loader::ConfigSource;
pub use models::{
    BackgroundPolicy, HistoryConfig, LifecycleConfig, NextUpConfig,
    PlaybackConfig, ScrobbleConfig, ServerConfig, TimelineConfig,
};
pub use validation::ConfigValidationError;
