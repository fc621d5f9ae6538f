//! Core data model definitions shared across Playhead crates.
#![allow(missing_docs)]

pub mod error;
pub mod ids;
pub mod marker;
pub mod next_up;
pub mod playback;
pub mod stream;

// Intentionally curated re-exports for downstream consumers.
pub use error::{ModelError, Result as ModelResult};
pub use ids::{ContentId, ServerSessionId};
pub use marker::{Marker, MarkerKind};
pub use next_up::{ContentKind, NextUpInfo};
pub use playback::{
    Countdown, PlayState, ScrobbleState, TimelineSample, TimelineState,
};
pub use stream::{
    DeliveryOutcome, ResolvedStream, StreamProfile, StreamProtocol,
    StreamTicket,
};
