#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use playhead_config::PlaybackConfig;
use playhead_contracts::prelude::{
    EngineEvent, EngineEventSender, EngineFault, MediaServer, PlatformSession,
    RemoteError, RemoteResult, TimelineUpdate, VideoEngine, WatchHistory,
};
use playhead_core::{
    Collaborators, OrchestratorHandle, PlaybackOrchestrator, PlaybackSnapshot,
};
use playhead_model::{
    ContentId, Marker, NextUpInfo, ServerSessionId, StreamProfile, StreamTicket,
    TimelineState,
};
use tokio::sync::Notify;
use url::Url;

/// Every collaborator call, in the order the orchestrator made it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Resolve(String),
    StartSession(String),
    Timeline { state: TimelineState, position_ms: u64 },
    StopSession(String),
    FetchMarkers(String),
    FetchNextUp(String),
    ScrobbleStart(String, u8),
    ScrobblePause(String, u8),
    ScrobbleStop(String, u8),
    Load(String),
    Seek(u64),
    SetPaused(bool),
    Unload,
    Activate,
    Deactivate,
}

pub type CallLog = Arc<Mutex<Vec<Call>>>;

fn record(log: &CallLog, call: Call) {
    log.lock().unwrap().push(call);
}

pub fn start_url(content_id: &str) -> Url {
    Url::parse(&format!("http://media.test/start/{content_id}.m3u8")).unwrap()
}

pub fn session_url(content_id: &str) -> Url {
    Url::parse(&format!("http://media.test/session/{content_id}/index.m3u8"))
        .unwrap()
}

pub fn next_up(content_id: &str) -> NextUpInfo {
    NextUpInfo {
        content_id: ContentId::new(content_id),
        title: format!("Episode {content_id}"),
        thumbnail_ref: None,
        label: "S1:E2".to_string(),
    }
}

#[derive(Default)]
pub struct FakeServer {
    log: CallLog,
    markers: Mutex<HashMap<String, Vec<Marker>>>,
    next_up: Mutex<HashMap<String, NextUpInfo>>,
    unplayable: Mutex<HashSet<String>>,
    fail_start: AtomicBool,
    fail_timeline: AtomicBool,
    resolve_gate: Mutex<Option<Arc<Notify>>>,
    start_gate: Mutex<Option<Arc<Notify>>>,
    stop_gate: Mutex<Option<Arc<Notify>>>,
}

impl FakeServer {
    pub fn set_markers(&self, content_id: &str, markers: Vec<Marker>) {
        self.markers
            .lock()
            .unwrap()
            .insert(content_id.to_string(), markers);
    }

    pub fn set_next_up(&self, content_id: &str, info: NextUpInfo) {
        self.next_up
            .lock()
            .unwrap()
            .insert(content_id.to_string(), info);
    }

    pub fn mark_unplayable(&self, content_id: &str) {
        self.unplayable
            .lock()
            .unwrap()
            .insert(content_id.to_string());
    }

    pub fn fail_start(&self, fail: bool) {
        self.fail_start.store(fail, Ordering::SeqCst);
    }

    pub fn fail_timeline(&self, fail: bool) {
        self.fail_timeline.store(fail, Ordering::SeqCst);
    }

    /// Hold every resolution until the returned gate is notified.
    pub fn hold_resolution(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.resolve_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    /// Hold every start command, after it is recorded, until notified.
    pub fn hold_start(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.start_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    /// Hold every session stop, after it is recorded, until notified.
    pub fn hold_session_stop(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.stop_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }
}

async fn pass(gate: &Mutex<Option<Arc<Notify>>>) {
    let gate = gate.lock().unwrap().clone();
    if let Some(gate) = gate {
        gate.notified().await;
    }
}

#[async_trait]
impl MediaServer for FakeServer {
    async fn resolve_stream(
        &self,
        content_id: &ContentId,
        _profile: &StreamProfile,
    ) -> RemoteResult<StreamTicket> {
        record(&self.log, Call::Resolve(content_id.to_string()));
        pass(&self.resolve_gate).await;
        if self.unplayable.lock().unwrap().contains(content_id.as_str()) {
            return Err(RemoteError::NotPlayable("no media parts".into()));
        }
        Ok(StreamTicket {
            start_url: start_url(content_id.as_str()),
            session_url: session_url(content_id.as_str()),
            server_session_id: ServerSessionId::new(format!(
                "sess-{content_id}"
            )),
        })
    }

    async fn start_session(&self, start_url: &Url) -> RemoteResult<()> {
        record(&self.log, Call::StartSession(start_url.to_string()));
        pass(&self.start_gate).await;
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(RemoteError::Status {
                status: 503,
                message: "transcoder busy".into(),
            });
        }
        Ok(())
    }

    async fn update_timeline(&self, update: &TimelineUpdate) -> RemoteResult<()> {
        record(
            &self.log,
            Call::Timeline {
                state: update.state,
                position_ms: update.position_ms,
            },
        );
        if self.fail_timeline.load(Ordering::SeqCst) {
            return Err(RemoteError::Unreachable("offline".into()));
        }
        Ok(())
    }

    async fn stop_session(
        &self,
        server_session_id: &ServerSessionId,
    ) -> RemoteResult<()> {
        record(&self.log, Call::StopSession(server_session_id.to_string()));
        pass(&self.stop_gate).await;
        Ok(())
    }

    async fn fetch_markers(&self, content_id: &ContentId) -> RemoteResult<Vec<Marker>> {
        record(&self.log, Call::FetchMarkers(content_id.to_string()));
        Ok(self
            .markers
            .lock()
            .unwrap()
            .get(content_id.as_str())
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_next_up(
        &self,
        content_id: &ContentId,
    ) -> RemoteResult<Option<NextUpInfo>> {
        record(&self.log, Call::FetchNextUp(content_id.to_string()));
        Ok(self.next_up.lock().unwrap().get(content_id.as_str()).cloned())
    }
}

#[derive(Default)]
pub struct FakeHistory {
    log: CallLog,
}

#[async_trait]
impl WatchHistory for FakeHistory {
    async fn start(&self, content_id: &ContentId, progress: u8) -> RemoteResult<()> {
        record(&self.log, Call::ScrobbleStart(content_id.to_string(), progress));
        Ok(())
    }

    async fn pause(&self, content_id: &ContentId, progress: u8) -> RemoteResult<()> {
        record(&self.log, Call::ScrobblePause(content_id.to_string(), progress));
        Ok(())
    }

    async fn stop(&self, content_id: &ContentId, progress: u8) -> RemoteResult<()> {
        record(&self.log, Call::ScrobbleStop(content_id.to_string(), progress));
        Ok(())
    }
}

/// Engine double that keeps the event sender of the last load so tests
/// can play the engine's part.
#[derive(Default)]
pub struct FakeEngine {
    log: CallLog,
    events: Mutex<Option<EngineEventSender>>,
    fail_load: AtomicBool,
}

impl FakeEngine {
    pub fn emit(&self, event: EngineEvent) -> bool {
        match self.events.lock().unwrap().as_ref() {
            Some(sender) => sender.emit(event),
            None => false,
        }
    }

    pub fn fail_load(&self, fail: bool) {
        self.fail_load.store(fail, Ordering::SeqCst);
    }
}

impl VideoEngine for FakeEngine {
    fn load(&self, endpoint: &Url, events: EngineEventSender) -> Result<(), EngineFault> {
        record(&self.log, Call::Load(endpoint.to_string()));
        if self.fail_load.load(Ordering::SeqCst) {
            return Err(EngineFault("unsupported container".into()));
        }
        *self.events.lock().unwrap() = Some(events);
        Ok(())
    }

    fn seek(&self, position_ms: u64) {
        record(&self.log, Call::Seek(position_ms));
    }

    fn set_paused(&self, paused: bool) {
        record(&self.log, Call::SetPaused(paused));
    }

    fn unload(&self) {
        record(&self.log, Call::Unload);
    }
}

#[derive(Default)]
pub struct FakePlatform {
    log: CallLog,
}

impl PlatformSession for FakePlatform {
    fn activate(&self) {
        record(&self.log, Call::Activate);
    }

    fn deactivate(&self) {
        record(&self.log, Call::Deactivate);
    }
}

/// Config with the timeline reporter pushed far enough out that it stays
/// quiet unless a test advances the clock.
pub fn quiet_config() -> PlaybackConfig {
    let mut config = PlaybackConfig::default();
    config.timeline.initial_delay_ms = 600_000;
    config.timeline.interval_ms = 600_000;
    config.lifecycle.teardown_step_timeout_ms = 1_000;
    config
}

pub struct Harness {
    pub handle: OrchestratorHandle,
    pub server: Arc<FakeServer>,
    pub engine: Arc<FakeEngine>,
    log: CallLog,
}

pub fn harness(config: PlaybackConfig) -> Harness {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let log = CallLog::default();
    let server = Arc::new(FakeServer {
        log: Arc::clone(&log),
        ..FakeServer::default()
    });
    let engine = Arc::new(FakeEngine {
        log: Arc::clone(&log),
        ..FakeEngine::default()
    });
    let history = Arc::new(FakeHistory {
        log: Arc::clone(&log),
    });
    let platform = Arc::new(FakePlatform {
        log: Arc::clone(&log),
    });

    let handle = PlaybackOrchestrator::spawn(
        config,
        Collaborators::new(server.clone(), history, engine.clone(), platform),
    );
    Harness {
        handle,
        server,
        engine,
        log,
    }
}

impl Harness {
    pub fn calls(&self) -> Vec<Call> {
        self.log.lock().unwrap().clone()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|call| matches(call)).count()
    }

    pub fn position_of(&self, call: &Call) -> Option<usize> {
        self.calls().iter().position(|seen| seen == call)
    }

    pub fn emit(&self, event: EngineEvent) {
        assert!(self.engine.emit(event), "engine has no live sender");
    }

    /// Wait until `call` has been recorded. Remote teardown runs off the
    /// orchestrator task, so its calls land some time after the phase
    /// change.
    pub async fn wait_for_call(&self, call: &Call) {
        let seen = tokio::time::timeout(Duration::from_secs(5), async {
            while self.position_of(call).is_none() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await;
        assert!(seen.is_ok(), "{call:?} was never made; saw {:?}", self.calls());
    }

    /// Wait until a published snapshot satisfies `predicate`.
    pub async fn wait_for(
        &self,
        predicate: impl FnMut(&PlaybackSnapshot) -> bool,
    ) -> PlaybackSnapshot {
        let mut rx = self.handle.subscribe();
        let snapshot = tokio::time::timeout(Duration::from_secs(5), rx.wait_for(predicate))
            .await
            .expect("snapshot condition not reached in time")
            .expect("orchestrator stopped");
        snapshot.clone()
    }
}
