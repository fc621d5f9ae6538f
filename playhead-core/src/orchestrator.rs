use playhead_config::PlaybackConfig;
use playhead_contracts::prelude::SessionEngineEvent;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info};

use crate::error::{PlaybackError, Result};
use crate::session::{
    Collaborators, OpenRequest, PlaybackSnapshot, SessionLifecycle,
    SessionUpdate,
};

const COMMAND_CAPACITY: usize = 64;

/// Caller requests delivered to the orchestrator task.
#[derive(Debug)]
pub(crate) enum Command {
    Open {
        request: OpenRequest,
        reply: oneshot::Sender<Result<()>>,
    },
    Close {
        reply: oneshot::Sender<()>,
    },
    SkipActiveMarker,
    PlayNextNow,
    Background,
    Foreground,
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Entry point that starts the orchestrator task.
#[derive(Debug)]
pub struct PlaybackOrchestrator;

impl PlaybackOrchestrator {
    /// Spawn the single task that owns every session this orchestrator
    /// plays. Must be called from within a tokio runtime.
    pub fn spawn(config: PlaybackConfig, deps: Collaborators) -> OrchestratorHandle {
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_CAPACITY);
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        let (engine_tx, engine_rx) = mpsc::unbounded_channel();
        let (snapshots_tx, snapshots_rx) =
            watch::channel(PlaybackSnapshot::default());

        let lifecycle = SessionLifecycle::new(
            config,
            deps,
            snapshots_tx,
            updates_tx,
            engine_tx,
        );
        tokio::spawn(run(lifecycle, commands_rx, updates_rx, engine_rx));

        OrchestratorHandle {
            commands: commands_tx,
            snapshots: snapshots_rx,
        }
    }
}

async fn run(
    mut lifecycle: SessionLifecycle,
    mut commands: mpsc::Receiver<Command>,
    mut updates: mpsc::UnboundedReceiver<SessionUpdate>,
    mut engine_events: mpsc::UnboundedReceiver<SessionEngineEvent>,
) {
    info!(target: "playback::session", "playback orchestrator started");
    loop {
        tokio::select! {
            biased;
            Some(event) = engine_events.recv() => {
                lifecycle.on_engine_event(event);
            }
            Some(update) = updates.recv() => {
                lifecycle.apply_update(update);
            }
            command = commands.recv() => match command {
                Some(Command::Shutdown { reply }) => {
                    lifecycle.shutdown(Some(reply));
                    break;
                }
                Some(command) => lifecycle.handle(command),
                None => {
                    debug!(
                        target: "playback::session",
                        "all orchestrator handles dropped"
                    );
                    lifecycle.shutdown(None);
                    break;
                }
            },
        }
    }
    info!(target: "playback::session", "playback orchestrator stopped");
}

/// Cloneable handle used by the UI layer.
#[derive(Debug, Clone)]
pub struct OrchestratorHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<PlaybackSnapshot>,
}

impl OrchestratorHandle {
    async fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| PlaybackError::OrchestratorStopped)
    }

    /// Open a title, retiring whatever is playing. Resolves once the
    /// stream is resolved and handed to the engine.
    pub async fn open(&self, request: OpenRequest) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Open { request, reply }).await?;
        rx.await.map_err(|_| PlaybackError::OrchestratorStopped)?
    }

    /// Close the current session; resolves once its remote cleanup has
    /// finished. The orchestrator itself never waits on that cleanup.
    pub async fn close(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Close { reply }).await?;
        rx.await.map_err(|_| PlaybackError::OrchestratorStopped)
    }

    /// Seek past the marker under the playhead, if any.
    pub async fn skip_active_marker(&self) -> Result<()> {
        self.send(Command::SkipActiveMarker).await
    }

    /// Advance to the next-up item without waiting for the countdown.
    pub async fn play_next_now(&self) -> Result<()> {
        self.send(Command::PlayNextNow).await
    }

    pub async fn background(&self) -> Result<()> {
        self.send(Command::Background).await
    }

    pub async fn foreground(&self) -> Result<()> {
        self.send(Command::Foreground).await
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.snapshots.clone()
    }

    pub fn snapshot_stream(&self) -> WatchStream<PlaybackSnapshot> {
        WatchStream::new(self.snapshots.clone())
    }

    /// Tear down the current session and stop the orchestrator task.
    pub async fn shutdown(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Shutdown { reply }).await?;
        rx.await.map_err(|_| PlaybackError::OrchestratorStopped)
    }
}
