/// Local playback state as reported by the video engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PlayState {
    #[default]
    Loading,
    Playing,
    Paused,
    Buffering,
    Ended,
    Errored,
}

impl PlayState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PlayState::Ended | PlayState::Errored)
    }
}

/// What has been reported to the watch-history service so far.
///
/// Transitions only `NotStarted -> Started -> {Paused <-> Started} ->
/// Stopped`; `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ScrobbleState {
    #[default]
    NotStarted,
    Started,
    Paused,
    Stopped,
}

/// State vocabulary understood by the remote server's timeline endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TimelineState {
    Playing,
    Paused,
    Stopped,
}

impl TimelineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimelineState::Playing => "playing",
            TimelineState::Paused => "paused",
            TimelineState::Stopped => "stopped",
        }
    }
}

impl From<PlayState> for TimelineState {
    fn from(state: PlayState) -> Self {
        match state {
            // Loading and buffering still mean "the user intends to watch".
            PlayState::Loading | PlayState::Playing | PlayState::Buffering => {
                TimelineState::Playing
            }
            PlayState::Paused => TimelineState::Paused,
            PlayState::Ended | PlayState::Errored => TimelineState::Stopped,
        }
    }
}

/// Latest clock reading shared with the timeline reporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimelineSample {
    pub position_ms: u64,
    pub duration_ms: u64,
    pub play_state: PlayState,
}

impl TimelineSample {
    pub fn timeline_state(&self) -> TimelineState {
        self.play_state.into()
    }
}

/// Auto-advance countdown shown near the end of episodic content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Countdown {
    pub seconds_remaining: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeline_state_follows_play_state() {
        assert_eq!(
            TimelineState::from(PlayState::Buffering),
            TimelineState::Playing
        );
        assert_eq!(
            TimelineState::from(PlayState::Paused),
            TimelineState::Paused
        );
        assert_eq!(
            TimelineState::from(PlayState::Ended),
            TimelineState::Stopped
        );
        assert_eq!(TimelineState::Stopped.as_str(), "stopped");
    }
}
