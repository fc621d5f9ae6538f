use std::fmt;

use playhead_model::{
    ContentId, ContentKind, Countdown, DeliveryOutcome, Marker, NextUpInfo,
    PlayState, ScrobbleState, ServerSessionId, TimelineSample,
};
use url::Url;

use crate::error::PlaybackError;
use crate::markers;

/// What the caller asks to play.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenRequest {
    pub content_id: ContentId,
    pub kind: ContentKind,
    /// Saved resume offset; `None` or `0` starts from the beginning.
    pub resume_ms: Option<u64>,
}

impl OpenRequest {
    pub fn new(content_id: impl Into<ContentId>, kind: ContentKind) -> Self {
        Self {
            content_id: content_id.into(),
            kind,
            resume_ms: None,
        }
    }

    pub fn episode(content_id: impl Into<ContentId>) -> Self {
        Self::new(content_id, ContentKind::Episode)
    }

    pub fn movie(content_id: impl Into<ContentId>) -> Self {
        Self::new(content_id, ContentKind::Movie)
    }

    pub fn with_resume(mut self, resume_ms: u64) -> Self {
        self.resume_ms = Some(resume_ms);
        self
    }
}

/// Lifecycle phase of the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionPhase {
    /// No session has been opened yet.
    #[default]
    Idle,
    Opening,
    Ready,
    Active,
    Closing,
    Closed,
    Errored,
}

impl SessionPhase {
    /// Phases in which engine events are applied.
    pub fn accepts_engine_events(&self) -> bool {
        matches!(self, SessionPhase::Ready | SessionPhase::Active)
    }

    /// Teardown has run (or is running); nothing else may happen.
    pub fn is_retired(&self) -> bool {
        matches!(
            self,
            SessionPhase::Closing | SessionPhase::Closed | SessionPhase::Errored
        )
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionPhase::Idle => "idle",
            SessionPhase::Opening => "opening",
            SessionPhase::Ready => "ready",
            SessionPhase::Active => "active",
            SessionPhase::Closing => "closing",
            SessionPhase::Closed => "closed",
            SessionPhase::Errored => "errored",
        };
        f.write_str(name)
    }
}

/// State of one playback of one title.
///
/// Owned by the lifecycle manager; sub-components receive the pieces they
/// need by reference. Write-once fields refuse a second assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackSession {
    content_id: ContentId,
    server_session_id: ServerSessionId,
    stream_endpoint: Option<Url>,
    position_ms: u64,
    duration_ms: u64,
    play_state: PlayState,
    markers: Option<Vec<Marker>>,
    next_up: Option<Option<NextUpInfo>>,
    scrobble_state: ScrobbleState,
}

impl PlaybackSession {
    pub fn new(content_id: ContentId) -> Self {
        Self {
            content_id,
            server_session_id: ServerSessionId::empty(),
            stream_endpoint: None,
            position_ms: 0,
            duration_ms: 0,
            play_state: PlayState::Loading,
            markers: None,
            next_up: None,
            scrobble_state: ScrobbleState::NotStarted,
        }
    }

    pub fn content_id(&self) -> &ContentId {
        &self.content_id
    }

    pub fn server_session_id(&self) -> &ServerSessionId {
        &self.server_session_id
    }

    /// Returns false when an id was already assigned.
    pub fn assign_server_session_id(&mut self, id: ServerSessionId) -> bool {
        if !self.server_session_id.is_empty() {
            return false;
        }
        self.server_session_id = id;
        true
    }

    pub fn stream_endpoint(&self) -> Option<&Url> {
        self.stream_endpoint.as_ref()
    }

    pub fn set_stream_endpoint(&mut self, endpoint: Url) {
        self.stream_endpoint = Some(endpoint);
    }

    pub fn position_ms(&self) -> u64 {
        self.position_ms
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    /// Apply a clock report from the engine. A zero duration keeps the
    /// previously known one.
    pub fn record_clock(&mut self, position_ms: u64, duration_ms: u64) {
        if duration_ms > 0 {
            self.duration_ms = duration_ms;
        }
        self.position_ms = self.clamp_position(position_ms);
    }

    pub fn record_duration(&mut self, duration_ms: u64) {
        if duration_ms > 0 {
            self.duration_ms = duration_ms;
            self.position_ms = self.clamp_position(self.position_ms);
        }
    }

    /// Apply a completed seek reported by the engine.
    pub fn record_seek(&mut self, position_ms: u64) {
        self.position_ms = self.clamp_position(position_ms);
    }

    fn clamp_position(&self, position_ms: u64) -> u64 {
        if self.duration_ms > 0 {
            position_ms.min(self.duration_ms)
        } else {
            position_ms
        }
    }

    pub fn play_state(&self) -> PlayState {
        self.play_state
    }

    pub fn set_play_state(&mut self, play_state: PlayState) {
        self.play_state = play_state;
    }

    pub fn markers(&self) -> &[Marker] {
        self.markers.as_deref().unwrap_or_default()
    }

    /// Stored sorted by start. Returns false when already set.
    pub fn set_markers(&mut self, markers: Vec<Marker>) -> bool {
        if self.markers.is_some() {
            return false;
        }
        let sorted = markers::sorted(&markers).into_owned();
        self.markers = Some(sorted);
        true
    }

    pub fn next_up(&self) -> Option<&NextUpInfo> {
        self.next_up.as_ref().and_then(Option::as_ref)
    }

    /// Returns false when already set.
    pub fn set_next_up(&mut self, next_up: Option<NextUpInfo>) -> bool {
        if self.next_up.is_some() {
            return false;
        }
        self.next_up = Some(next_up);
        true
    }

    pub fn scrobble_state(&self) -> ScrobbleState {
        self.scrobble_state
    }

    pub fn scrobble_state_mut(&mut self) -> &mut ScrobbleState {
        &mut self.scrobble_state
    }

    pub fn sample(&self) -> TimelineSample {
        TimelineSample {
            position_ms: self.position_ms,
            duration_ms: self.duration_ms,
            play_state: self.play_state,
        }
    }
}

/// Observable state published after every change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackSnapshot {
    pub content_id: Option<ContentId>,
    pub phase: SessionPhase,
    pub play_state: PlayState,
    pub position_ms: u64,
    pub duration_ms: u64,
    pub active_marker: Option<Marker>,
    pub countdown: Option<Countdown>,
    pub next_up: Option<NextUpInfo>,
    pub error: Option<PlaybackError>,
    pub delivery: Option<DeliveryOutcome>,
}
