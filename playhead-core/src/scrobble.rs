use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use playhead_contracts::prelude::{RemoteError, WatchHistory};
use playhead_model::{ContentId, PlayState, ScrobbleState};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{ReportError, TeardownError, TeardownStep};

/// Remote watch-history call issued on a scrobble transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScrobbleVerb {
    Start,
    Pause,
    Stop,
}

impl fmt::Display for ScrobbleVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScrobbleVerb::Start => "start",
            ScrobbleVerb::Pause => "pause",
            ScrobbleVerb::Stop => "stop",
        })
    }
}

/// Playback input that can move the scrobble state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrobbleInput {
    Playing,
    Paused,
    Finished,
}

impl ScrobbleInput {
    /// Loading and buffering are not reported.
    pub fn from_play_state(state: PlayState) -> Option<Self> {
        match state {
            PlayState::Playing => Some(ScrobbleInput::Playing),
            PlayState::Paused => Some(ScrobbleInput::Paused),
            PlayState::Ended | PlayState::Errored => {
                Some(ScrobbleInput::Finished)
            }
            PlayState::Loading | PlayState::Buffering => None,
        }
    }
}

/// Next scrobble state and the remote call it requires, if any.
///
/// Repeating the current state is a no-op. `Stopped` is terminal. A session
/// that never started goes straight to `Stopped` without a remote call.
pub fn transition(
    current: ScrobbleState,
    input: ScrobbleInput,
) -> (ScrobbleState, Option<ScrobbleVerb>) {
    use ScrobbleInput as In;
    use ScrobbleState as St;

    match (current, input) {
        (St::Stopped, _) => (St::Stopped, None),
        (St::NotStarted, In::Playing) | (St::Paused, In::Playing) => {
            (St::Started, Some(ScrobbleVerb::Start))
        }
        (St::Started, In::Paused) => (St::Paused, Some(ScrobbleVerb::Pause)),
        (St::Started, In::Finished) | (St::Paused, In::Finished) => {
            (St::Stopped, Some(ScrobbleVerb::Stop))
        }
        (St::NotStarted, In::Finished) => (St::Stopped, None),
        (state, _) => (state, None),
    }
}

/// Percentage of the content watched, rounded and clamped to `0..=100`.
pub fn progress_percent(position_ms: u64, duration_ms: u64) -> u8 {
    if duration_ms == 0 {
        return 0;
    }
    let percent = (position_ms as f64 / duration_ms as f64 * 100.0).round();
    percent.clamp(0.0, 100.0) as u8
}

#[derive(Debug, Clone, Copy)]
struct ScrobbleCall {
    verb: ScrobbleVerb,
    progress: u8,
}

/// Mirrors play-state transitions to the watch-history service.
///
/// Calls are fire-and-forget from the caller's point of view but are
/// delivered in order by a single worker task.
pub struct ScrobbleCoordinator {
    content_id: ContentId,
    queue: Option<mpsc::UnboundedSender<ScrobbleCall>>,
    worker: Option<JoinHandle<()>>,
}

impl fmt::Debug for ScrobbleCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScrobbleCoordinator")
            .field("content_id", &self.content_id)
            .field("enabled", &self.queue.is_some())
            .finish()
    }
}

impl ScrobbleCoordinator {
    /// With `enabled == false` the state machine still advances but no
    /// remote call is made.
    pub fn start(
        content_id: ContentId,
        history: Arc<dyn WatchHistory>,
        enabled: bool,
    ) -> Self {
        if !enabled {
            return Self {
                content_id,
                queue: None,
                worker: None,
            };
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(deliver(content_id.clone(), history, rx));
        Self {
            content_id,
            queue: Some(tx),
            worker: Some(worker),
        }
    }

    /// Feed a play-state change; returns the verb dispatched, if any.
    pub fn observe(
        &self,
        state: &mut ScrobbleState,
        play_state: PlayState,
        progress: u8,
    ) -> Option<ScrobbleVerb> {
        let input = ScrobbleInput::from_play_state(play_state)?;
        self.apply(state, input, progress)
    }

    /// Session end: move to `Stopped`, reporting if a scrobble is open.
    pub fn stop(
        &self,
        state: &mut ScrobbleState,
        progress: u8,
    ) -> Option<ScrobbleVerb> {
        self.apply(state, ScrobbleInput::Finished, progress)
    }

    fn apply(
        &self,
        state: &mut ScrobbleState,
        input: ScrobbleInput,
        progress: u8,
    ) -> Option<ScrobbleVerb> {
        let (next, verb) = transition(*state, input);
        *state = next;
        let verb = verb?;

        debug!(
            target: "playback::scrobble",
            content_id = %self.content_id,
            verb = %verb,
            progress,
            "scrobble transition"
        );
        if let Some(queue) = &self.queue
            && queue.send(ScrobbleCall { verb, progress }).is_err()
        {
            debug!(target: "playback::scrobble", "scrobble worker already gone");
        }
        Some(verb)
    }

    /// Close the queue and wait for queued calls to be delivered.
    pub async fn finish(&mut self, timeout: Duration) -> Result<(), TeardownError> {
        self.close_queue().wait(timeout).await
    }

    /// Close the queue; the returned drain waits for delivery and can be
    /// awaited from another task.
    pub fn close_queue(&mut self) -> ScrobbleDrain {
        self.queue.take();
        ScrobbleDrain {
            worker: self.worker.take(),
        }
    }
}

/// Calls still queued when a coordinator was closed.
#[derive(Debug)]
pub struct ScrobbleDrain {
    worker: Option<JoinHandle<()>>,
}

impl ScrobbleDrain {
    pub async fn wait(self, timeout: Duration) -> Result<(), TeardownError> {
        let Some(mut worker) = self.worker else {
            return Ok(());
        };

        match tokio::time::timeout(timeout, &mut worker).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(join_err)) => Err(TeardownError::Aborted {
                step: TeardownStep::ScrobbleStop,
                message: join_err.to_string(),
            }),
            Err(_) => {
                worker.abort();
                Err(TeardownError::TimedOut {
                    step: TeardownStep::ScrobbleStop,
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
        }
    }
}

async fn deliver(
    content_id: ContentId,
    history: Arc<dyn WatchHistory>,
    mut rx: mpsc::UnboundedReceiver<ScrobbleCall>,
) {
    while let Some(call) = rx.recv().await {
        let result = match call.verb {
            ScrobbleVerb::Start => history.start(&content_id, call.progress).await,
            ScrobbleVerb::Pause => history.pause(&content_id, call.progress).await,
            ScrobbleVerb::Stop => history.stop(&content_id, call.progress).await,
        };

        match result {
            Ok(()) => {}
            Err(RemoteError::Unauthenticated) => debug!(
                target: "playback::scrobble",
                verb = %call.verb,
                "watch history not authenticated; skipping"
            ),
            Err(source) => {
                let err = ReportError::Scrobble {
                    verb: call.verb,
                    source,
                };
                warn!(
                    target: "playback::scrobble",
                    content_id = %content_id,
                    error = %err,
                    "scrobble call failed"
                );
            }
        }
    }
}
