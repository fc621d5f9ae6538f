//! Plex-compatible media server adapter.
//!
//! Resolution happens in two phases: a transcode *decision* request that
//! names the session, then a *start* request that materializes it. The
//! start URL carries the access token in its query because the video engine
//! fetches it directly.

mod models;

use std::time::Duration;

use async_trait::async_trait;
use playhead_config::ServerConfig;
use playhead_contracts::prelude::{
    MediaServer, RemoteError, RemoteResult, TimelineUpdate,
};
use playhead_model::{
    ContentId, Marker, NextUpInfo, ServerSessionId, StreamProfile, StreamProtocol,
    StreamTicket,
};
use reqwest::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use crate::error::{
    ClientBuildError, expect_success, normalize_base_url, read_json,
    transport_error,
};
use models::{DecisionContainer, Envelope, MetadataContainer, PlexMetadata};

const TRANSCODE_PREFIX: &str = "video/:/transcode/universal";

/// [`MediaServer`] backed by a Plex Media Server.
#[derive(Debug, Clone)]
pub struct PlexClient {
    http: Client,
    base_url: Url,
    token: Option<String>,
}

impl PlexClient {
    pub fn new(config: &ServerConfig) -> Result<Self, ClientBuildError> {
        let raw = config
            .base_url
            .as_deref()
            .ok_or(ClientBuildError::MissingBaseUrl)?;
        // Trailing slash so relative joins stay under the base path.
        let normalized = format!("{}/", normalize_base_url(raw)?);
        let base_url = Url::parse(&normalized)
            .map_err(|_| ClientBuildError::InvalidBaseUrl(raw.to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            "X-Plex-Client-Identifier",
            header_value("X-Plex-Client-Identifier", &config.client_identifier)?,
        );
        headers.insert(
            "X-Plex-Product",
            header_value("X-Plex-Product", &config.product)?,
        );
        if let Some(token) = config.token.as_deref() {
            let mut value = header_value("X-Plex-Token", token)?;
            value.set_sensitive(true);
            headers.insert("X-Plex-Token", value);
        }

        let http = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self {
            http,
            base_url,
            token: config.token.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> RemoteResult<Url> {
        self.base_url
            .join(path)
            .map_err(|err| RemoteError::Unreachable(format!("bad path {path}: {err}")))
    }

    fn with_token(&self, mut url: Url) -> Url {
        if let Some(token) = self.token.as_deref() {
            url.query_pairs_mut().append_pair("X-Plex-Token", token);
        }
        url
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: Url,
    ) -> RemoteResult<T> {
        let response = self.http.get(url).send().await.map_err(transport_error)?;
        let envelope: Envelope<T> = read_json(response).await?;
        Ok(envelope.media_container)
    }

    async fn metadata(&self, content_id: &ContentId) -> RemoteResult<PlexMetadata> {
        let mut url = self.endpoint(&format!("library/metadata/{content_id}"))?;
        url.query_pairs_mut().append_pair("includeMarkers", "1");
        let container: MetadataContainer = self.get_json(url).await?;
        container
            .metadata
            .into_iter()
            .next()
            .ok_or_else(|| RemoteError::NotFound(content_id.to_string()))
    }
}

fn header_value(
    name: &'static str,
    value: &str,
) -> Result<HeaderValue, ClientBuildError> {
    HeaderValue::from_str(value).map_err(|_| ClientBuildError::InvalidHeader { name })
}

fn transcode_params(
    url: &mut Url,
    content_id: &ContentId,
    profile: &StreamProfile,
    session: &str,
) {
    // directStream only allows remuxing inside the transcode session.
    let direct_stream = if profile.direct_stream { "1" } else { "0" };
    url.query_pairs_mut()
        .append_pair("path", &format!("/library/metadata/{content_id}"))
        .append_pair("protocol", profile.protocol.as_str())
        .append_pair("videoResolution", &profile.max_video_resolution)
        .append_pair("maxVideoBitrate", &profile.max_video_bitrate_kbps.to_string())
        .append_pair("audioChannels", &profile.audio_channels.to_string())
        .append_pair("directPlay", "0")
        .append_pair("directStream", direct_stream)
        .append_pair("session", session);
}

#[async_trait]
impl MediaServer for PlexClient {
    async fn resolve_stream(
        &self,
        content_id: &ContentId,
        profile: &StreamProfile,
    ) -> RemoteResult<StreamTicket> {
        let session = Uuid::new_v4().to_string();

        let mut decision_url =
            self.endpoint(&format!("{TRANSCODE_PREFIX}/decision"))?;
        transcode_params(&mut decision_url, content_id, profile, &session);
        let decision: DecisionContainer = self.get_json(decision_url).await?;
        if let Some(reason) = decision.refusal() {
            debug!(%content_id, %reason, "server refused to deliver content");
            return Err(RemoteError::NotPlayable(reason));
        }

        let mut start_url = self.endpoint(&format!(
            "{TRANSCODE_PREFIX}/start.{}",
            playlist_extension(profile)
        ))?;
        transcode_params(&mut start_url, content_id, profile, &session);
        let session_url = self.endpoint(&format!(
            "{TRANSCODE_PREFIX}/session/{session}/base/index.{}",
            playlist_extension(profile)
        ))?;

        Ok(StreamTicket {
            start_url: self.with_token(start_url),
            session_url: self.with_token(session_url),
            server_session_id: ServerSessionId::new(session),
        })
    }

    async fn start_session(&self, start_url: &Url) -> RemoteResult<()> {
        let response = self
            .http
            .get(start_url.clone())
            .send()
            .await
            .map_err(transport_error)?;
        expect_success(response).await
    }

    async fn update_timeline(&self, update: &TimelineUpdate) -> RemoteResult<()> {
        let mut url = self.endpoint("./:/timeline")?;
        url.query_pairs_mut()
            .append_pair("ratingKey", update.content_id.as_str())
            .append_pair("key", &format!("/library/metadata/{}", update.content_id))
            .append_pair("state", update.state.as_str())
            .append_pair("time", &update.position_ms.to_string())
            .append_pair("duration", &update.duration_ms.to_string());

        let mut request = self.http.get(url);
        if !update.server_session_id.is_empty() {
            request = request.header(
                "X-Plex-Session-Identifier",
                update.server_session_id.as_str(),
            );
        }
        let response = request.send().await.map_err(transport_error)?;
        expect_success(response).await
    }

    async fn stop_session(
        &self,
        server_session_id: &ServerSessionId,
    ) -> RemoteResult<()> {
        let mut url = self.endpoint(&format!("{TRANSCODE_PREFIX}/stop"))?;
        url.query_pairs_mut()
            .append_pair("session", server_session_id.as_str());
        let response = self.http.get(url).send().await.map_err(transport_error)?;
        match expect_success(response).await {
            // Already gone on the server side.
            Err(RemoteError::NotFound(_)) => Ok(()),
            other => other,
        }
    }

    async fn fetch_markers(&self, content_id: &ContentId) -> RemoteResult<Vec<Marker>> {
        Ok(self.metadata(content_id).await?.to_markers())
    }

    async fn fetch_next_up(
        &self,
        content_id: &ContentId,
    ) -> RemoteResult<Option<NextUpInfo>> {
        let current = self.metadata(content_id).await?;
        if !current.is_episode() {
            return Ok(None);
        }
        let Some(show) = current.grandparent_rating_key.as_deref() else {
            warn!(%content_id, "episode has no show key; no next-up item");
            return Ok(None);
        };

        let url = self.endpoint(&format!("library/metadata/{show}/allLeaves"))?;
        let leaves: MetadataContainer = self.get_json(url).await?;
        let next = leaves
            .metadata
            .iter()
            .skip_while(|leaf| leaf.rating_key.as_deref() != Some(content_id.as_str()))
            .nth(1)
            .and_then(PlexMetadata::to_next_up);
        Ok(next)
    }
}

fn playlist_extension(profile: &StreamProfile) -> &'static str {
    match profile.protocol {
        StreamProtocol::Dash => "mpd",
        _ => "m3u8",
    }
}
