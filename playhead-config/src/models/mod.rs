use std::time::Duration;

use playhead_model::StreamProfile;
use serde::{Deserialize, Serialize};

/// Top-level orchestrator settings.
///
/// Every section carries defaults so a deployment only has to spell out
/// what it changes.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Cadence of "now playing" reports to the media server.
    pub timeline: TimelineConfig,
    /// Auto-advance trigger tuning.
    pub next_up: NextUpConfig,
    /// Fixed transcode profile requested for every stream.
    pub stream: StreamProfile,
    /// Watch-history integration switch.
    pub scrobble: ScrobbleConfig,
    /// Session teardown and backgrounding behaviour.
    pub lifecycle: LifecycleConfig,
    /// Media server connection used by the HTTP adapter.
    pub server: ServerConfig,
    /// Watch-history connection used by the HTTP adapter.
    pub history: HistoryConfig,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct TimelineConfig {
    /// Period between timeline reports (ms).
    pub interval_ms: u64,
    /// Delay before the first report after the stream starts (ms).
    pub initial_delay_ms: u64,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            interval_ms: 10_000,
            initial_delay_ms: 2_000,
        }
    }
}

impl TimelineConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct NextUpConfig {
    /// Countdown window before the end when no credits marker exists (ms).
    pub fallback_window_ms: u64,
}

impl Default for NextUpConfig {
    fn default() -> Self {
        Self {
            fallback_window_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ScrobbleConfig {
    /// When false the coordinator still tracks state but sends nothing.
    pub enabled: bool,
}

impl Default for ScrobbleConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// What to do with a live session when the host app is backgrounded.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BackgroundPolicy {
    #[default]
    Pause,
    Close,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct LifecycleConfig {
    pub background_policy: BackgroundPolicy,
    /// Upper bound for each best-effort teardown network call (ms).
    pub teardown_step_timeout_ms: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            background_policy: BackgroundPolicy::Pause,
            teardown_step_timeout_ms: 5_000,
        }
    }
}

impl LifecycleConfig {
    pub fn teardown_step_timeout(&self) -> Duration {
        Duration::from_millis(self.teardown_step_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL of the media server, e.g. `http://10.0.0.5:32400`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub client_identifier: String,
    pub product: String,
    /// Per-request timeout (ms).
    pub request_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            token: None,
            client_identifier: "playhead".to_string(),
            product: "Playhead".to_string(),
            request_timeout_ms: 15_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct HistoryConfig {
    pub base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    /// Absent token means unauthenticated; every scrobble is a no-op.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// Key used for the content id inside the scrobble payload's `ids`.
    pub id_namespace: String,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.trakt.tv".to_string(),
            client_id: None,
            access_token: None,
            id_namespace: "plex".to_string(),
        }
    }
}
