use std::{
    env, fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, anyhow};
use tracing::{debug, info};

use crate::models::PlaybackConfig;
use crate::util::{non_empty, parse_bool, parse_duration_ms};

/// Source that produced the playback configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConfigSource {
    #[default]
    Default,
    EnvPath(PathBuf),
    EnvInline,
    File(PathBuf),
}

const DEFAULT_CANDIDATES: &[&str] = &[
    "playhead.toml",
    "playhead.json",
    "config/playhead.toml",
    "config/playhead.json",
];

impl PlaybackConfig {
    /// Load configuration using environment variables.
    /// Evaluation order:
    /// 1) `$PLAYHEAD_CONFIG_PATH` (TOML or JSON file),
    /// 2) `$PLAYHEAD_CONFIG_JSON` (inline JSON),
    /// 3) the first default file candidate that exists,
    /// 4) defaults.
    ///
    /// Individual `PLAYHEAD_*` overrides are applied on top, then the result
    /// is validated.
    pub fn load_from_env() -> anyhow::Result<(Self, ConfigSource)> {
        let lookup = |key: &str| env::var(key).ok();
        let (mut config, source) = Self::load_base(&lookup)?;
        config.apply_overrides(&lookup)?;
        config.validate()?;
        info!(source = ?source, "playback configuration loaded");
        Ok((config, source))
    }

    fn load_base(
        lookup: &dyn Fn(&str) -> Option<String>,
    ) -> anyhow::Result<(Self, ConfigSource)> {
        if let Some(path_str) = non_empty(lookup("PLAYHEAD_CONFIG_PATH")) {
            let path = PathBuf::from(path_str);
            let config = Self::load_from_file(&path)?;
            return Ok((config, ConfigSource::EnvPath(path)));
        }

        if let Some(raw) = non_empty(lookup("PLAYHEAD_CONFIG_JSON")) {
            let parsed = Self::parse_json(&raw)
                .context("failed to parse PLAYHEAD_CONFIG_JSON")?;
            return Ok((parsed, ConfigSource::EnvInline));
        }

        if let Some(path) = Self::find_default_file() {
            let config = Self::load_from_file(&path)?;
            return Ok((config, ConfigSource::File(path)));
        }

        Ok((Self::default(), ConfigSource::Default))
    }

    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path).with_context(|| {
            format!("failed to read playback config from {}", path.display())
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::parse_json(&contents).with_context(|| {
                format!("invalid playback config {}", path.display())
            }),
            Some("toml") => toml::from_str(&contents).map_err(|err| {
                anyhow!("invalid playback config {}: {}", path.display(), err)
            }),
            _ => Self::parse_from_str(&contents, &path.display().to_string()),
        }
    }

    pub fn parse_from_str(
        contents: &str,
        origin: &str,
    ) -> anyhow::Result<Self> {
        // Try TOML first, then JSON for convenience.
        toml::from_str(contents).or_else(|toml_err| {
            serde_json::from_str(contents).map_err(|json_err| {
                anyhow!(
                    "failed to parse playback config {}: toml error: {}; json error: {}",
                    origin,
                    toml_err,
                    json_err
                )
            })
        })
    }

    pub fn parse_json(raw: &str) -> anyhow::Result<Self> {
        serde_json::from_str(raw)
            .map_err(|err| anyhow!("invalid playback config json: {err}"))
    }

    /// Apply single-value `PLAYHEAD_*` overrides read through `lookup`.
    pub fn apply_overrides(
        &mut self,
        lookup: &dyn Fn(&str) -> Option<String>,
    ) -> anyhow::Result<()> {
        if let Some(url) = non_empty(lookup("PLAYHEAD_SERVER_URL")) {
            self.server.base_url = Some(url);
        }
        if let Some(token) = non_empty(lookup("PLAYHEAD_SERVER_TOKEN")) {
            self.server.token = Some(token);
        }
        if let Some(raw) = non_empty(lookup("PLAYHEAD_TIMELINE_INTERVAL")) {
            self.timeline.interval_ms = parse_duration_ms(&raw)
                .context("PLAYHEAD_TIMELINE_INTERVAL")?;
        }
        if let Some(raw) = non_empty(lookup("PLAYHEAD_FALLBACK_WINDOW")) {
            self.next_up.fallback_window_ms = parse_duration_ms(&raw)
                .context("PLAYHEAD_FALLBACK_WINDOW")?;
        }
        if let Some(raw) = non_empty(lookup("PLAYHEAD_SCROBBLE_ENABLED")) {
            self.scrobble.enabled = parse_bool(&raw).ok_or_else(|| {
                anyhow!("PLAYHEAD_SCROBBLE_ENABLED: '{raw}' is not a boolean")
            })?;
        }
        if let Some(token) = non_empty(lookup("PLAYHEAD_HISTORY_TOKEN")) {
            self.history.access_token = Some(token);
        }
        debug!("applied playback config overrides");
        Ok(())
    }

    fn find_default_file() -> Option<PathBuf> {
        DEFAULT_CANDIDATES
            .iter()
            .map(PathBuf::from)
            .find(|candidate| candidate.is_file())
    }
}
