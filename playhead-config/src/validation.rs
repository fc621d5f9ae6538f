use thiserror::Error;
use url::Url;

use crate::models::PlaybackConfig;

/// Configuration values that would make the orchestrator misbehave.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("timeline.interval_ms must be greater than zero")]
    ZeroTimelineInterval,

    #[error("invalid stream profile: {0}")]
    Stream(String),

    #[error("server.base_url '{0}' is not a valid http(s) URL")]
    ServerUrl(String),

    #[error("history.base_url '{0}' is not a valid http(s) URL")]
    HistoryUrl(String),
}

fn is_http_url(raw: &str) -> bool {
    Url::parse(raw)
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false)
}

impl PlaybackConfig {
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.timeline.interval_ms == 0 {
            return Err(ConfigValidationError::ZeroTimelineInterval);
        }
        self.stream
            .validate()
            .map_err(|err| ConfigValidationError::Stream(err.to_string()))?;
        if let Some(base) = &self.server.base_url
            && !is_http_url(base)
        {
            return Err(ConfigValidationError::ServerUrl(base.clone()));
        }
        if !is_http_url(&self.history.base_url) {
            return Err(ConfigValidationError::HistoryUrl(
                self.history.base_url.clone(),
            ));
        }
        Ok(())
    }
}
