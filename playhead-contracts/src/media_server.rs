use async_trait::async_trait;
use playhead_model::{
    ContentId, Marker, NextUpInfo, ServerSessionId, StreamProfile,
    StreamTicket, TimelineState,
};
use url::Url;

use crate::error::RemoteResult;

/// One "now playing" report for the server's timeline endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineUpdate {
    pub content_id: ContentId,
    pub server_session_id: ServerSessionId,
    pub state: TimelineState,
    pub position_ms: u64,
    pub duration_ms: u64,
}

/// Remote media server operations used during a playback session.
#[cfg_attr(feature = "mocks", mockall::automock)]
#[async_trait]
pub trait MediaServer: Send + Sync {
    /// Ask the server how `content_id` will be delivered under `profile`.
    async fn resolve_stream(
        &self,
        content_id: &ContentId,
        profile: &StreamProfile,
    ) -> RemoteResult<StreamTicket>;

    /// Materialize the transcode session behind `start_url`.
    async fn start_session(&self, start_url: &Url) -> RemoteResult<()>;

    async fn update_timeline(&self, update: &TimelineUpdate)
    -> RemoteResult<()>;

    async fn stop_session(
        &self,
        server_session_id: &ServerSessionId,
    ) -> RemoteResult<()>;

    async fn fetch_markers(
        &self,
        content_id: &ContentId,
    ) -> RemoteResult<Vec<Marker>>;

    async fn fetch_next_up(
        &self,
        content_id: &ContentId,
    ) -> RemoteResult<Option<NextUpInfo>>;
}
