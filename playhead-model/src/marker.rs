use crate::error::{ModelError, Result};

/// Semantic tag attached to a marker range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum MarkerKind {
    Intro,
    Credits,
    Custom,
}

/// A tagged time range inside a piece of content, in milliseconds.
///
/// Both ends are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Marker {
    pub kind: MarkerKind,
    pub start_ms: u64,
    pub end_ms: u64,
}

impl Marker {
    pub fn new(kind: MarkerKind, start_ms: u64, end_ms: u64) -> Result<Self> {
        if end_ms < start_ms {
            return Err(ModelError::InvalidMarker(format!(
                "{kind:?} marker ends ({end_ms}ms) before it starts ({start_ms}ms)"
            )));
        }
        Ok(Self {
            kind,
            start_ms,
            end_ms,
        })
    }

    pub fn contains(&self, position_ms: u64) -> bool {
        self.start_ms <= position_ms && position_ms <= self.end_ms
    }

    pub fn is_credits(&self) -> bool {
        matches!(self.kind, MarkerKind::Credits)
    }
}
