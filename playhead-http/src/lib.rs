//! HTTP adapters for the playback orchestrator's remote collaborators.
//!
//! [`PlexClient`] implements the media server contract and [`TraktClient`]
//! the watch-history contract. Both are plain `reqwest` clients and can be
//! handed to `playhead_core::Collaborators` behind an `Arc`.
#![allow(missing_docs)]

pub mod error;
pub mod plex;
pub mod trakt;

pub use error::ClientBuildError;
pub use plex::PlexClient;
pub use trakt::TraktClient;
