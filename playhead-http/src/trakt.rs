//! Trakt-compatible watch-history adapter.

use std::time::Duration;

use async_trait::async_trait;
use playhead_config::HistoryConfig;
use playhead_contracts::prelude::{RemoteError, RemoteResult, WatchHistory};
use playhead_model::ContentId;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use serde_json::json;
use tracing::debug;
use url::Url;

use crate::error::{
    ClientBuildError, expect_success, normalize_base_url, transport_error,
};

const API_VERSION: &str = "2";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// [`WatchHistory`] that posts scrobbles to a Trakt-style API.
///
/// Without an access token every call succeeds without touching the
/// network.
#[derive(Debug, Clone)]
pub struct TraktClient {
    http: Client,
    base_url: Url,
    access_token: Option<String>,
    id_namespace: String,
}

impl TraktClient {
    pub fn new(config: &HistoryConfig) -> Result<Self, ClientBuildError> {
        let normalized = format!("{}/", normalize_base_url(&config.base_url)?);
        let base_url = Url::parse(&normalized).map_err(|_| {
            ClientBuildError::InvalidBaseUrl(config.base_url.clone())
        })?;

        let mut headers = HeaderMap::new();
        headers.insert("trakt-api-version", HeaderValue::from_static(API_VERSION));
        if let Some(client_id) = config.client_id.as_deref() {
            headers.insert(
                "trakt-api-key",
                HeaderValue::from_str(client_id).map_err(|_| {
                    ClientBuildError::InvalidHeader {
                        name: "trakt-api-key",
                    }
                })?,
            );
        }

        let http = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url,
            access_token: config.access_token.clone(),
            id_namespace: config.id_namespace.clone(),
        })
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    async fn scrobble(
        &self,
        action: &'static str,
        content_id: &ContentId,
        progress: u8,
    ) -> RemoteResult<()> {
        let Some(token) = self.access_token.as_deref() else {
            debug!(
                target: "playback::scrobble",
                action,
                %content_id,
                "no watch-history credentials; skipping"
            );
            return Ok(());
        };

        let url = self
            .base_url
            .join(&format!("scrobble/{action}"))
            .map_err(|err| RemoteError::Unreachable(err.to_string()))?;
        let body = json!({
            "progress": progress,
            "media": { "ids": { (self.id_namespace.as_str()): content_id.as_str() } },
        });

        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| RemoteError::Unauthenticated)?;
        auth.set_sensitive(true);

        let response = self
            .http
            .post(url)
            .header(AUTHORIZATION, auth)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        // 409: the same scrobble was already recorded moments ago.
        if response.status() == StatusCode::CONFLICT {
            debug!(target: "playback::scrobble", action, %content_id, "duplicate scrobble");
            return Ok(());
        }
        expect_success(response).await
    }
}

#[async_trait]
impl WatchHistory for TraktClient {
    async fn start(&self, content_id: &ContentId, progress: u8) -> RemoteResult<()> {
        self.scrobble("start", content_id, progress).await
    }

    async fn pause(&self, content_id: &ContentId, progress: u8) -> RemoteResult<()> {
        self.scrobble("pause", content_id, progress).await
    }

    async fn stop(&self, content_id: &ContentId, progress: u8) -> RemoteResult<()> {
        self.scrobble("stop", content_id, progress).await
    }
}
