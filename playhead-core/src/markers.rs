//! Marker engine: pure lookups over a marker list and a playback position.
//!
//! Callers may pass unsorted input; the functions sort a private copy when
//! needed and never mutate what they were given.

use std::borrow::Cow;

use playhead_model::Marker;

/// Countdown window used when content has no credits marker.
pub const DEFAULT_FALLBACK_WINDOW_MS: u64 = 30_000;

/// Markers ordered by `start_ms`, borrowing when already sorted.
pub fn sorted(markers: &[Marker]) -> Cow<'_, [Marker]> {
    if markers.is_sorted_by_key(|marker| marker.start_ms) {
        Cow::Borrowed(markers)
    } else {
        let mut owned = markers.to_vec();
        owned.sort_by_key(|marker| marker.start_ms);
        Cow::Owned(owned)
    }
}

/// The marker whose inclusive range contains `position_ms`.
///
/// Overlapping ranges resolve to the earliest-starting marker.
pub fn active_marker(markers: &[Marker], position_ms: u64) -> Option<Marker> {
    sorted(markers)
        .iter()
        .take_while(|marker| marker.start_ms <= position_ms)
        .find(|marker| marker.contains(position_ms))
        .copied()
}

/// Position at which the end-of-content countdown starts.
///
/// Uses the last credits marker when there is one, otherwise
/// `duration - fallback_window`. Clamped to `[0, duration]` once the
/// duration is known.
pub fn trigger_point(
    markers: &[Marker],
    duration_ms: u64,
    fallback_window_ms: u64,
) -> u64 {
    let point = markers
        .iter()
        .filter(|marker| marker.is_credits())
        .map(|marker| marker.start_ms)
        .max()
        .unwrap_or_else(|| duration_ms.saturating_sub(fallback_window_ms));

    if duration_ms > 0 {
        point.min(duration_ms)
    } else {
        point
    }
}
