use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use playhead_config::{BackgroundPolicy, PlaybackConfig};
use playhead_contracts::prelude::{
    EngineEvent, EngineEventSender, MediaServer, PlatformSession,
    RemoteResult, SessionEngineEvent, TimelineUpdate, VideoEngine,
    WatchHistory,
};
use playhead_model::{
    ContentId, ContentKind, Countdown, DeliveryOutcome, Marker, NextUpInfo,
    PlayState, ResolvedStream, ServerSessionId, TimelineSample, TimelineState,
};
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use super::state::{
    OpenRequest, PlaybackSession, PlaybackSnapshot, SessionPhase,
};
use crate::error::{
    EngineError, PlaybackError, ResolutionError, TeardownError, TeardownStep,
};
use crate::markers;
use crate::next_up::{EndSignal, NextUpController};
use crate::orchestrator::Command;
use crate::resolver::StreamResolver;
use crate::scrobble::{ScrobbleCoordinator, ScrobbleDrain, progress_percent};
use crate::timeline::TimelineReporter;

/// External systems the orchestrator drives.
#[derive(Clone)]
pub struct Collaborators {
    pub server: Arc<dyn MediaServer>,
    pub history: Arc<dyn WatchHistory>,
    pub engine: Arc<dyn VideoEngine>,
    pub platform: Arc<dyn PlatformSession>,
}

impl Collaborators {
    pub fn new(
        server: Arc<dyn MediaServer>,
        history: Arc<dyn WatchHistory>,
        engine: Arc<dyn VideoEngine>,
        platform: Arc<dyn PlatformSession>,
    ) -> Self {
        Self {
            server,
            history,
            engine,
            platform,
        }
    }
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

/// Results of work a session spawned, stamped with its generation.
#[derive(Debug)]
pub(crate) enum SessionUpdate {
    Resolved {
        generation: u64,
        result: Result<ResolvedStream, ResolutionError>,
    },
    MarkersFetched {
        generation: u64,
        markers: Vec<Marker>,
    },
    NextUpFetched {
        generation: u64,
        next_up: Option<NextUpInfo>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TeardownMode {
    /// The player goes away; platform settings are released.
    Final,
    /// A successor session follows immediately and keeps platform settings.
    Advance,
}

type OpenReply = oneshot::Sender<Result<(), PlaybackError>>;

struct LiveSession {
    generation: u64,
    kind: ContentKind,
    phase: SessionPhase,
    session: PlaybackSession,
    token: CancellationToken,
    samples: watch::Sender<TimelineSample>,
    reporter: Option<TimelineReporter>,
    scrobbler: ScrobbleCoordinator,
    next_up: NextUpController,
    buffering: bool,
    pending_resume_ms: Option<u64>,
    delivery: Option<DeliveryOutcome>,
    engine_loaded: bool,
    server_session_released: bool,
    platform_active: bool,
    active_marker: Option<Marker>,
    countdown: Option<Countdown>,
    error: Option<PlaybackError>,
    open_reply: Option<OpenReply>,
}

impl LiveSession {
    fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            content_id: Some(self.session.content_id().clone()),
            phase: self.phase,
            play_state: self.session.play_state(),
            position_ms: self.session.position_ms(),
            duration_ms: self.session.duration_ms(),
            active_marker: self.active_marker,
            countdown: self.countdown,
            next_up: self.session.next_up().cloned(),
            error: self.error.clone(),
            delivery: self.delivery,
        }
    }

    fn progress(&self) -> u8 {
        progress_percent(self.session.position_ms(), self.session.duration_ms())
    }

    /// Marker, countdown and scrobble routing after a clock change.
    fn route_clock(&mut self) -> Option<EndSignal> {
        let position_ms = self.session.position_ms();
        let duration_ms = self.session.duration_ms();
        self.active_marker =
            markers::active_marker(self.session.markers(), position_ms);

        let progress = self.progress();
        let play_state = self.session.play_state();
        self.scrobbler.observe(
            self.session.scrobble_state_mut(),
            play_state,
            progress,
        );

        let evaluation = self.next_up.evaluate(
            position_ms,
            duration_ms,
            self.session.markers(),
            self.session.next_up(),
            self.kind,
        );
        self.countdown = evaluation.countdown;
        evaluation.signal
    }
}

/// Single owner of the live session. Every input is applied here, one at a
/// time, by the orchestrator task.
pub(crate) struct SessionLifecycle {
    config: PlaybackConfig,
    deps: Collaborators,
    resolver: StreamResolver,
    current: Option<LiveSession>,
    generations: u64,
    snapshots: watch::Sender<PlaybackSnapshot>,
    updates: mpsc::UnboundedSender<SessionUpdate>,
    engine_events: mpsc::UnboundedSender<SessionEngineEvent>,
}

impl SessionLifecycle {
    pub(crate) fn new(
        config: PlaybackConfig,
        deps: Collaborators,
        snapshots: watch::Sender<PlaybackSnapshot>,
        updates: mpsc::UnboundedSender<SessionUpdate>,
        engine_events: mpsc::UnboundedSender<SessionEngineEvent>,
    ) -> Self {
        let resolver =
            StreamResolver::new(Arc::clone(&deps.server), config.stream.clone());
        Self {
            config,
            deps,
            resolver,
            current: None,
            generations: 0,
            snapshots,
            updates,
            engine_events,
        }
    }

    fn publish(&self) {
        let snapshot = match &self.current {
            Some(live) => {
                live.samples.send_replace(live.session.sample());
                live.snapshot()
            }
            None => PlaybackSnapshot::default(),
        };
        self.snapshots.send_replace(snapshot);
    }

    pub(crate) fn handle(&mut self, command: Command) {
        match command {
            Command::Open { request, reply } => self.open(request, Some(reply)),
            Command::Close { reply } => {
                self.teardown(TeardownMode::Final, Some(reply))
            }
            Command::SkipActiveMarker => self.skip_active_marker(),
            Command::PlayNextNow => self.play_next_now(),
            Command::Background => self.background(),
            Command::Foreground => {
                debug!(target: "playback::session", "foregrounded");
            }
            Command::Shutdown { reply } => self.shutdown(Some(reply)),
        }
    }

    /// Retire the live session; `done` fires once its remote cleanup is
    /// finished.
    pub(crate) fn shutdown(&mut self, done: Option<oneshot::Sender<()>>) {
        self.teardown(TeardownMode::Final, done);
    }

    fn open(&mut self, request: OpenRequest, reply: Option<OpenReply>) {
        // The previous session is retired before a new one exists.
        self.teardown(TeardownMode::Final, None);
        self.begin(request, reply, false);
    }

    fn begin(
        &mut self,
        request: OpenRequest,
        reply: Option<OpenReply>,
        platform_carried: bool,
    ) {
        self.generations += 1;
        let generation = self.generations;
        let OpenRequest {
            content_id,
            kind,
            resume_ms,
        } = request;

        if !platform_carried {
            self.deps.platform.activate();
        }

        info!(
            target: "playback::session",
            content_id = %content_id,
            generation,
            ?kind,
            resume_ms,
            "opening session"
        );

        let session = PlaybackSession::new(content_id.clone());
        let (samples, _) = watch::channel(session.sample());
        let token = CancellationToken::new();
        let scrobbler = ScrobbleCoordinator::start(
            content_id.clone(),
            Arc::clone(&self.deps.history),
            self.config.scrobble.enabled,
        );

        self.current = Some(LiveSession {
            generation,
            kind,
            phase: SessionPhase::Opening,
            session,
            token: token.clone(),
            samples,
            reporter: None,
            scrobbler,
            next_up: NextUpController::new(self.config.next_up.fallback_window_ms),
            buffering: false,
            pending_resume_ms: None,
            delivery: None,
            engine_loaded: false,
            server_session_released: false,
            platform_active: true,
            active_marker: None,
            countdown: None,
            error: None,
            open_reply: reply,
        });
        self.publish();

        let resolver = self.resolver.clone();
        let updates = self.updates.clone();
        tokio::spawn(async move {
            // Run to completion even if retired: a started transcode must
            // still be released.
            let result = resolver.resolve(&content_id, resume_ms).await;
            if token.is_cancelled() {
                if let Ok(stream) = result {
                    release_orphan(&resolver, &stream).await;
                }
                return;
            }
            let _ = updates.send(SessionUpdate::Resolved { generation, result });
        });
    }

    pub(crate) fn apply_update(&mut self, update: SessionUpdate) {
        match update {
            SessionUpdate::Resolved { generation, result } => {
                self.on_resolved(generation, result)
            }
            SessionUpdate::MarkersFetched {
                generation,
                markers,
            } => {
                let Some(live) = self.current_for(generation) else {
                    return;
                };
                if live.session.set_markers(markers) {
                    live.active_marker = markers::active_marker(
                        live.session.markers(),
                        live.session.position_ms(),
                    );
                    debug!(
                        target: "playback::session",
                        count = live.session.markers().len(),
                        "markers attached"
                    );
                    self.publish();
                }
            }
            SessionUpdate::NextUpFetched {
                generation,
                next_up,
            } => {
                let Some(live) = self.current_for(generation) else {
                    return;
                };
                if live.session.set_next_up(next_up) {
                    debug!(
                        target: "playback::session",
                        next_up = ?live.session.next_up().map(|n| n.content_id.as_str()),
                        "next up attached"
                    );
                    self.publish();
                }
            }
        }
    }

    /// The live session if it matches `generation` and is not retired.
    fn current_for(&mut self, generation: u64) -> Option<&mut LiveSession> {
        self.current.as_mut().filter(|live| {
            live.generation == generation && !live.phase.is_retired()
        })
    }

    fn on_resolved(
        &mut self,
        generation: u64,
        result: Result<ResolvedStream, ResolutionError>,
    ) {
        let Some(live) = self.current.as_mut().filter(|live| {
            live.generation == generation && live.phase == SessionPhase::Opening
        }) else {
            debug!(
                target: "playback::session",
                generation,
                "discarding resolution for a retired session"
            );
            if let Ok(stream) = result {
                let resolver = self.resolver.clone();
                tokio::spawn(async move {
                    release_orphan(&resolver, &stream).await;
                });
            }
            return;
        };

        let stream = match result {
            Ok(stream) => stream,
            Err(err) => {
                self.fail(PlaybackError::Resolution(err));
                return;
            }
        };

        live.session
            .assign_server_session_id(stream.server_session_id.clone());
        live.session.set_stream_endpoint(stream.endpoint.clone());
        live.delivery = Some(stream.delivery);
        live.pending_resume_ms = stream.resume_offset_ms;
        live.phase = SessionPhase::Ready;
        live.reporter = Some(TimelineReporter::start(
            Arc::clone(&self.deps.server),
            live.session.content_id().clone(),
            stream.server_session_id.clone(),
            live.samples.subscribe(),
            self.config.timeline,
            &live.token,
        ));

        let events =
            EngineEventSender::new(generation, self.engine_events.clone());
        match self.deps.engine.load(&stream.endpoint, events) {
            Ok(()) => {
                live.engine_loaded = true;
                if let Some(reply) = live.open_reply.take() {
                    let _ = reply.send(Ok(()));
                }
                info!(
                    target: "playback::session",
                    generation,
                    endpoint = %stream.endpoint,
                    "session ready"
                );
                self.publish();
            }
            Err(fault) => {
                self.fail(EngineError::from(fault).into());
            }
        }
    }

    pub(crate) fn on_engine_event(&mut self, incoming: SessionEngineEvent) {
        let SessionEngineEvent { generation, event } = incoming;
        let Some(live) = self.current.as_mut().filter(|live| {
            live.generation == generation && live.phase.accepts_engine_events()
        }) else {
            trace!(
                target: "playback::session",
                generation,
                ?event,
                "ignoring engine event for a retired session"
            );
            return;
        };

        let signal = match event {
            EngineEvent::Loaded { duration_ms } => {
                live.session.record_duration(duration_ms);
                if live.phase == SessionPhase::Ready {
                    let resume = live.pending_resume_ms.take();
                    if let Some(offset) = resume {
                        if duration_ms == 0 || offset < duration_ms {
                            self.deps.engine.seek(offset);
                        } else {
                            debug!(
                                target: "playback::session",
                                offset,
                                duration_ms,
                                "resume offset past the end; starting from zero"
                            );
                        }
                    }

                    spawn_enrichment(
                        Arc::clone(&self.deps.server),
                        self.updates.clone(),
                        live.token.clone(),
                        generation,
                        live.session.content_id().clone(),
                    );

                    live.session.set_play_state(PlayState::Playing);
                    let progress = progress_percent(
                        resume.unwrap_or_default(),
                        live.session.duration_ms(),
                    );
                    live.scrobbler.observe(
                        live.session.scrobble_state_mut(),
                        PlayState::Playing,
                        progress,
                    );
                    live.phase = SessionPhase::Active;
                    info!(
                        target: "playback::session",
                        generation,
                        duration_ms,
                        "session active"
                    );
                }
                None
            }
            EngineEvent::Progress {
                position_ms,
                duration_ms,
                is_playing,
            } => {
                live.session.record_clock(position_ms, duration_ms);
                let state = if live.buffering {
                    PlayState::Buffering
                } else if is_playing {
                    PlayState::Playing
                } else {
                    PlayState::Paused
                };
                live.session.set_play_state(state);
                if live.phase == SessionPhase::Active {
                    live.route_clock()
                } else {
                    None
                }
            }
            EngineEvent::Buffering(buffering) => {
                live.buffering = buffering;
                if buffering {
                    live.session.set_play_state(PlayState::Buffering);
                } else if live.session.play_state() == PlayState::Buffering {
                    live.session.set_play_state(PlayState::Playing);
                }
                None
            }
            EngineEvent::SeekCompleted { position_ms } => {
                live.session.record_seek(position_ms);
                if live.phase == SessionPhase::Active {
                    live.route_clock()
                } else {
                    None
                }
            }
            EngineEvent::Ended => {
                live.session.set_play_state(PlayState::Ended);
                live.countdown = None;
                let progress = live.progress();
                live.scrobbler.observe(
                    live.session.scrobble_state_mut(),
                    PlayState::Ended,
                    progress,
                );
                live.next_up.on_end(live.session.next_up(), live.kind)
            }
            EngineEvent::Error { message } => {
                self.fail(EngineError::Playback(message).into());
                return;
            }
        };

        self.publish();
        match signal {
            Some(EndSignal::Advance) => self.advance(),
            Some(EndSignal::Close) => self.teardown(TeardownMode::Final, None),
            None => {}
        }
    }

    fn skip_active_marker(&mut self) {
        let Some(live) = self
            .current
            .as_mut()
            .filter(|live| live.phase == SessionPhase::Active)
        else {
            return;
        };
        let Some(marker) = live.active_marker else {
            debug!(target: "playback::session", "no active marker to skip");
            return;
        };
        info!(
            target: "playback::session",
            kind = ?marker.kind,
            to_ms = marker.end_ms,
            "skipping marker"
        );
        self.deps.engine.seek(marker.end_ms);
    }

    fn play_next_now(&mut self) {
        let ready = self.current.as_ref().is_some_and(|live| {
            matches!(live.phase, SessionPhase::Ready | SessionPhase::Active)
                && live.session.next_up().is_some()
        });
        if ready {
            self.advance();
        } else {
            debug!(target: "playback::session", "no next up to play");
        }
    }

    fn background(&mut self) {
        match self.config.lifecycle.background_policy {
            BackgroundPolicy::Pause => {
                let playing = self.current.as_ref().is_some_and(|live| {
                    matches!(live.phase, SessionPhase::Ready | SessionPhase::Active)
                });
                if playing {
                    debug!(target: "playback::session", "backgrounded; pausing");
                    self.deps.engine.set_paused(true);
                }
            }
            BackgroundPolicy::Close => {
                debug!(target: "playback::session", "backgrounded; closing");
                self.teardown(TeardownMode::Final, None);
            }
        }
    }

    /// Replace the current session with its next-up successor.
    fn advance(&mut self) {
        let Some(next) = self
            .current
            .as_ref()
            .filter(|live| !live.phase.is_retired())
            .and_then(|live| live.session.next_up().cloned())
        else {
            return;
        };

        info!(
            target: "playback::session",
            next = %next.content_id,
            label = %next.label,
            "advancing to next up"
        );
        self.teardown(TeardownMode::Advance, None);
        self.begin(OpenRequest::episode(next.content_id), None, true);
    }

    fn fail(&mut self, err: PlaybackError) {
        if let Some(live) = self.current.as_mut() {
            error!(
                target: "playback::session",
                content_id = %live.session.content_id(),
                generation = live.generation,
                error = %err,
                "session failed"
            );
            live.session.set_play_state(PlayState::Errored);
            live.error = Some(err);
        }
        self.teardown(TeardownMode::Final, None);
    }

    /// Ordered, exactly-once cleanup of the live session.
    ///
    /// The remote steps (final scrobble, terminal timeline report, server
    /// session stop) run in order on a detached task; the session reaches
    /// `Closed` without waiting for them. `done` fires once they finish.
    fn teardown(&mut self, mode: TeardownMode, done: Option<oneshot::Sender<()>>) {
        let Some(live) = self
            .current
            .as_mut()
            .filter(|live| !live.phase.is_retired())
        else {
            trace!(target: "playback::session", "no live session to retire");
            if let Some(done) = done {
                let _ = done.send(());
            }
            return;
        };

        live.phase = SessionPhase::Closing;
        let content_id = live.session.content_id().clone();
        let generation = live.generation;
        debug!(
            target: "playback::session",
            content_id = %content_id,
            generation,
            ?mode,
            "closing session"
        );
        self.snapshots.send_replace(live.snapshot());

        // 1. final scrobble
        let progress = live.progress();
        live.scrobbler
            .stop(live.session.scrobble_state_mut(), progress);
        let scrobbles = live.scrobbler.close_queue();

        // 2. timeline timer plus the terminal stopped report
        if let Some(mut reporter) = live.reporter.take() {
            reporter.stop();
        }
        let terminal_report = live.session.stream_endpoint().is_some().then(|| {
            TimelineUpdate {
                content_id: content_id.clone(),
                server_session_id: live.session.server_session_id().clone(),
                state: TimelineState::Stopped,
                position_ms: live.session.position_ms(),
                duration_ms: live.session.duration_ms(),
            }
        });

        // 3. server transcode session
        let server_session = (!live.server_session_released).then(|| {
            live.server_session_released = true;
            live.session.server_session_id().clone()
        });

        tokio::spawn(
            RemoteRelease {
                server: Arc::clone(&self.deps.server),
                resolver: self.resolver.clone(),
                content_id: content_id.clone(),
                scrobbles,
                terminal_report,
                server_session,
                step_timeout: self.config.lifecycle.teardown_step_timeout(),
            }
            .run(done),
        );

        // 4. pending timers and in-flight work
        live.token.cancel();
        if live.engine_loaded {
            live.engine_loaded = false;
            self.deps.engine.unload();
        }

        if mode == TeardownMode::Final && live.platform_active {
            live.platform_active = false;
            self.deps.platform.deactivate();
        }

        live.active_marker = None;
        live.countdown = None;
        live.phase = if live.error.is_some() {
            SessionPhase::Errored
        } else {
            SessionPhase::Closed
        };
        if let Some(reply) = live.open_reply.take() {
            let outcome = live.error.clone().unwrap_or(PlaybackError::Cancelled);
            let _ = reply.send(Err(outcome));
        }

        info!(
            target: "playback::session",
            content_id = %content_id,
            generation,
            phase = %live.phase,
            "session closed"
        );
        self.publish();
    }
}

/// Remote cleanup of one retired session, each step bounded and
/// independent of the others.
struct RemoteRelease {
    server: Arc<dyn MediaServer>,
    resolver: StreamResolver,
    content_id: ContentId,
    scrobbles: ScrobbleDrain,
    terminal_report: Option<TimelineUpdate>,
    server_session: Option<ServerSessionId>,
    step_timeout: Duration,
}

impl RemoteRelease {
    async fn run(self, done: Option<oneshot::Sender<()>>) {
        let Self {
            server,
            resolver,
            content_id,
            scrobbles,
            terminal_report,
            server_session,
            step_timeout,
        } = self;

        if let Err(err) = scrobbles.wait(step_timeout).await {
            log_teardown(&content_id, &err);
        }

        if let Some(update) = terminal_report {
            let result = bounded(
                TeardownStep::TimelineStop,
                step_timeout,
                server.update_timeline(&update),
            )
            .await;
            if let Err(err) = result {
                log_teardown(&content_id, &err);
            }
        }

        if let Some(server_session_id) = server_session {
            let result = bounded(
                TeardownStep::SessionStop,
                step_timeout,
                resolver.stop_session(&server_session_id),
            )
            .await;
            if let Err(err) = result {
                log_teardown(&content_id, &err);
            }
        }

        debug!(
            target: "playback::session",
            content_id = %content_id,
            "remote teardown finished"
        );
        if let Some(done) = done {
            let _ = done.send(());
        }
    }
}

async fn bounded<F>(
    step: TeardownStep,
    limit: Duration,
    call: F,
) -> Result<(), TeardownError>
where
    F: Future<Output = RemoteResult<()>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(source)) => Err(TeardownError::Remote { step, source }),
        Err(_) => Err(TeardownError::TimedOut {
            step,
            timeout_ms: limit.as_millis() as u64,
        }),
    }
}

fn log_teardown(content_id: &ContentId, err: &TeardownError) {
    warn!(
        target: "playback::session",
        content_id = %content_id,
        error = %err,
        "teardown step failed"
    );
}

/// A resolution that landed after its session was retired still owns a
/// transcode on the server.
async fn release_orphan(resolver: &StreamResolver, stream: &ResolvedStream) {
    if let Err(err) = resolver.stop_session(&stream.server_session_id).await {
        debug!(
            target: "playback::session",
            server_session_id = %stream.server_session_id,
            error = %err,
            "failed to release orphaned server session"
        );
    }
}

/// Best-effort marker and next-up lookups. Failures leave the session
/// without markers or a successor.
fn spawn_enrichment(
    server: Arc<dyn MediaServer>,
    updates: mpsc::UnboundedSender<SessionUpdate>,
    token: CancellationToken,
    generation: u64,
    content_id: ContentId,
) {
    tokio::spawn(async move {
        let markers = tokio::select! {
            _ = token.cancelled() => return,
            result = server.fetch_markers(&content_id) => result,
        };
        let markers = markers.unwrap_or_else(|err| {
            debug!(
                target: "playback::session",
                content_id = %content_id,
                error = %err,
                "marker lookup failed"
            );
            Vec::new()
        });
        if token.is_cancelled() {
            return;
        }
        let _ = updates.send(SessionUpdate::MarkersFetched {
            generation,
            markers,
        });

        let next_up = tokio::select! {
            _ = token.cancelled() => return,
            result = server.fetch_next_up(&content_id) => result,
        };
        let next_up = next_up.unwrap_or_else(|err| {
            debug!(
                target: "playback::session",
                content_id = %content_id,
                error = %err,
                "next up lookup failed"
            );
            None
        });
        if token.is_cancelled() {
            return;
        }
        let _ = updates.send(SessionUpdate::NextUpFetched {
            generation,
            next_up,
        });
    });
}
