use std::fmt;
use std::sync::Arc;

use playhead_contracts::prelude::{MediaServer, RemoteResult};
use playhead_model::{
    ContentId, DeliveryOutcome, ResolvedStream, ServerSessionId, StreamProfile,
};
use tracing::{debug, info, warn};

use crate::error::ResolutionError;

/// Turns a content id into a playable endpoint plus the server session
/// that owns the transcode.
#[derive(Clone)]
pub struct StreamResolver {
    server: Arc<dyn MediaServer>,
    profile: StreamProfile,
}

impl fmt::Debug for StreamResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamResolver")
            .field("profile", &self.profile)
            .finish_non_exhaustive()
    }
}

impl StreamResolver {
    pub fn new(server: Arc<dyn MediaServer>, profile: StreamProfile) -> Self {
        Self { server, profile }
    }

    pub fn profile(&self) -> &StreamProfile {
        &self.profile
    }

    /// Resolve and eagerly start the stream.
    ///
    /// A failed eager start is not fatal: the start URL is handed to the
    /// engine instead and the server creates the session on first fetch.
    pub async fn resolve(
        &self,
        content_id: &ContentId,
        resume_offset_ms: Option<u64>,
    ) -> Result<ResolvedStream, ResolutionError> {
        let ticket = self
            .server
            .resolve_stream(content_id, &self.profile)
            .await
            .map_err(|err| ResolutionError::from_remote(content_id.clone(), err))?;

        let (endpoint, delivery) =
            match self.server.start_session(&ticket.start_url).await {
                Ok(()) => (ticket.session_url, DeliveryOutcome::Started),
                Err(err) => {
                    warn!(
                        content_id = %content_id,
                        error = %err,
                        "eager stream start failed; falling back to lazy start"
                    );
                    (ticket.start_url, DeliveryOutcome::LazyStart)
                }
            };

        info!(
            content_id = %content_id,
            server_session_id = %ticket.server_session_id,
            delivery = ?delivery,
            "stream resolved"
        );

        Ok(ResolvedStream {
            endpoint,
            server_session_id: ticket.server_session_id,
            delivery,
            resume_offset_ms: resume_offset_ms.filter(|offset| *offset > 0),
        })
    }

    /// Release the server-side transcode. An empty id is a no-op.
    pub async fn stop_session(
        &self,
        server_session_id: &ServerSessionId,
    ) -> RemoteResult<()> {
        if server_session_id.is_empty() {
            debug!("no server session to stop");
            return Ok(());
        }
        self.server.stop_session(server_session_id).await
    }
}
