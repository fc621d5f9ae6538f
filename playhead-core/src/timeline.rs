use std::fmt;
use std::sync::Arc;

use playhead_config::TimelineConfig;
use playhead_contracts::prelude::{MediaServer, TimelineUpdate};
use playhead_model::{ContentId, ServerSessionId, TimelineSample};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::error::ReportError;

/// Periodic "now playing" reporter for one session.
///
/// Samples are read live from the session's watch channel at each tick, so
/// a report always carries the latest known position and state.
pub struct TimelineReporter {
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl fmt::Debug for TimelineReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimelineReporter")
            .field("running", &self.is_running())
            .finish()
    }
}

struct ReportTarget {
    server: Arc<dyn MediaServer>,
    content_id: ContentId,
    server_session_id: ServerSessionId,
    samples: watch::Receiver<TimelineSample>,
}

impl TimelineReporter {
    /// Spawn the reporter. The first report fires after the configured
    /// initial delay, then every `interval`.
    pub fn start(
        server: Arc<dyn MediaServer>,
        content_id: ContentId,
        server_session_id: ServerSessionId,
        samples: watch::Receiver<TimelineSample>,
        config: TimelineConfig,
        parent: &CancellationToken,
    ) -> Self {
        let token = parent.child_token();
        let target = ReportTarget {
            server,
            content_id,
            server_session_id,
            samples,
        };
        let handle = tokio::spawn(run(target, config, token.clone()));
        Self {
            token,
            handle: Some(handle),
        }
    }

    /// Cancel the timer. Idempotent; sends no report of its own.
    pub fn stop(&mut self) {
        self.token.cancel();
        if self.handle.take().is_some() {
            debug!(target: "playback::timeline", "timeline reporter stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some() && !self.token.is_cancelled()
    }
}

impl Drop for TimelineReporter {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

async fn run(
    target: ReportTarget,
    config: TimelineConfig,
    token: CancellationToken,
) {
    tokio::select! {
        _ = token.cancelled() => return,
        _ = time::sleep(config.initial_delay()) => {}
    }
    report(&target, &token).await;

    let period = config.interval();
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => report(&target, &token).await,
        }
    }
}

async fn report(target: &ReportTarget, token: &CancellationToken) {
    let sample = *target.samples.borrow();
    let update = TimelineUpdate {
        content_id: target.content_id.clone(),
        server_session_id: target.server_session_id.clone(),
        state: sample.timeline_state(),
        position_ms: sample.position_ms,
        duration_ms: sample.duration_ms,
    };

    let result = tokio::select! {
        _ = token.cancelled() => return,
        result = target.server.update_timeline(&update) => result,
    };

    match result {
        Ok(()) => trace!(
            target: "playback::timeline",
            content_id = %update.content_id,
            state = update.state.as_str(),
            position_ms = update.position_ms,
            "timeline reported"
        ),
        Err(err) => {
            let err = ReportError::Timeline(err);
            warn!(
                target: "playback::timeline",
                content_id = %update.content_id,
                error = %err,
                "timeline report failed"
            );
        }
    }
}
