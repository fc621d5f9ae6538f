use playhead_model::{ContentKind, Countdown, Marker, NextUpInfo};
use tracing::debug;

use crate::markers::trigger_point;

/// What to do once the countdown (or the content itself) runs out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndSignal {
    /// Retire this session and open the next-up item.
    Advance,
    /// Retire this session without a successor.
    Close,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NextUpEvaluation {
    /// Seconds left, shown only while an advance is pending.
    pub countdown: Option<Countdown>,
    pub signal: Option<EndSignal>,
}

/// Decides when the end-of-content countdown is shown and fires its
/// signal. Signals are edge-triggered: at most one per session.
#[derive(Debug, Clone)]
pub struct NextUpController {
    fallback_window_ms: u64,
    fired: bool,
}

impl NextUpController {
    pub fn new(fallback_window_ms: u64) -> Self {
        Self {
            fallback_window_ms,
            fired: false,
        }
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }

    /// Re-evaluate on a clock update.
    pub fn evaluate(
        &mut self,
        position_ms: u64,
        duration_ms: u64,
        markers: &[Marker],
        next_up: Option<&NextUpInfo>,
        kind: ContentKind,
    ) -> NextUpEvaluation {
        if self.fired || duration_ms == 0 {
            return NextUpEvaluation::default();
        }

        let trigger = trigger_point(markers, duration_ms, self.fallback_window_ms);
        if position_ms < trigger {
            return NextUpEvaluation::default();
        }

        let seconds_remaining =
            duration_ms.saturating_sub(position_ms).div_ceil(1_000);
        let advancing = will_advance(next_up, kind);

        if seconds_remaining > 0 {
            return NextUpEvaluation {
                countdown: advancing.then_some(Countdown { seconds_remaining }),
                signal: None,
            };
        }

        let signal = self.fire(advancing);
        NextUpEvaluation {
            countdown: advancing.then_some(Countdown {
                seconds_remaining: 0,
            }),
            signal: Some(signal),
        }
    }

    /// The engine reported end of content; same outcome as the countdown
    /// reaching zero.
    pub fn on_end(
        &mut self,
        next_up: Option<&NextUpInfo>,
        kind: ContentKind,
    ) -> Option<EndSignal> {
        if self.fired {
            return None;
        }
        Some(self.fire(will_advance(next_up, kind)))
    }

    fn fire(&mut self, advancing: bool) -> EndSignal {
        self.fired = true;
        let signal = if advancing {
            EndSignal::Advance
        } else {
            EndSignal::Close
        };
        debug!(target: "playback::session", ?signal, "end of content signal");
        signal
    }
}

fn will_advance(next_up: Option<&NextUpInfo>, kind: ContentKind) -> bool {
    kind.is_episodic() && next_up.is_some()
}
