use async_trait::async_trait;
use playhead_model::ContentId;

use crate::error::RemoteResult;

/// Third-party watch-history ("scrobble") service.
///
/// Implementations should answer `Ok(())` without side effects when they
/// hold no credentials; callers treat every error as best-effort.
#[cfg_attr(feature = "mocks", mockall::automock)]
#[async_trait]
pub trait WatchHistory: Send + Sync {
    async fn start(&self, content_id: &ContentId, progress: u8)
    -> RemoteResult<()>;

    async fn pause(&self, content_id: &ContentId, progress: u8)
    -> RemoteResult<()>;

    async fn stop(&self, content_id: &ContentId, progress: u8)
    -> RemoteResult<()>;
}

/// Watch-history stand-in for deployments without an integration.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopWatchHistory;

#[async_trait]
impl WatchHistory for NoopWatchHistory {
    async fn start(&self, _: &ContentId, _: u8) -> RemoteResult<()> {
        Ok(())
    }

    async fn pause(&self, _: &ContentId, _: u8) -> RemoteResult<()> {
        Ok(())
    }

    async fn stop(&self, _: &ContentId, _: u8) -> RemoteResult<()> {
        Ok(())
    }
}
