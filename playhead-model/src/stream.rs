use std::fmt;

use url::Url;

use crate::error::{ModelError, Result};
use crate::ids::ServerSessionId;

/// Delivery protocol requested from the transcoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum StreamProtocol {
    #[default]
    Hls,
    Dash,
    Http,
}

impl StreamProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamProtocol::Hls => "hls",
            StreamProtocol::Dash => "dash",
            StreamProtocol::Http => "http",
        }
    }
}

impl fmt::Display for StreamProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed transcode profile. Not negotiated per device.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StreamProfile {
    pub protocol: StreamProtocol,
    /// `WIDTHxHEIGHT` ceiling, e.g. `1920x1080`.
    pub max_video_resolution: String,
    pub max_video_bitrate_kbps: u32,
    pub audio_channels: u8,
    /// Lets the server copy compatible source tracks into the transcode
    /// session instead of re-encoding them. Playback still goes through
    /// the server's transcode session; direct play of the source file is
    /// never requested.
    pub direct_stream: bool,
}

impl Default for StreamProfile {
    fn default() -> Self {
        Self {
            protocol: StreamProtocol::Hls,
            max_video_resolution: "1920x1080".to_string(),
            max_video_bitrate_kbps: 20_000,
            audio_channels: 2,
            direct_stream: false,
        }
    }
}

impl StreamProfile {
    pub fn validate(&self) -> Result<()> {
        if self.max_video_bitrate_kbps == 0 {
            return Err(ModelError::InvalidProfile(
                "max_video_bitrate_kbps must be greater than zero".to_string(),
            ));
        }
        let valid_resolution = self
            .max_video_resolution
            .split_once('x')
            .map(|(w, h)| w.parse::<u32>().is_ok() && h.parse::<u32>().is_ok())
            .unwrap_or(false);
        if !valid_resolution {
            return Err(ModelError::InvalidProfile(format!(
                "max_video_resolution '{}' is not WIDTHxHEIGHT",
                self.max_video_resolution
            )));
        }
        Ok(())
    }
}

/// First-phase answer from the server: where to start and where to play.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamTicket {
    /// Issuing a request here materializes the transcode session.
    pub start_url: Url,
    /// Playable once the session has been started.
    pub session_url: Url,
    pub server_session_id: ServerSessionId,
}

/// How the resolved endpoint came to be playable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DeliveryOutcome {
    /// The start command succeeded and the session URL is used.
    Started,
    /// The start command failed; the start URL is played directly and the
    /// server is expected to start the session on first byte request.
    LazyStart,
}

/// Output of the stream resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedStream {
    pub endpoint: Url,
    pub server_session_id: ServerSessionId,
    pub delivery: DeliveryOutcome,
    /// Saved position to seek to once the engine reports itself loaded.
    pub resume_offset_ms: Option<u64>,
}
