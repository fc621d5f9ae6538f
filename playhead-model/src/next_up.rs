use crate::ids::ContentId;

/// Broad content classification used to pick the end-of-content behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ContentKind {
    Movie,
    Episode,
    #[default]
    Other,
}

impl ContentKind {
    /// Only episodes auto-advance to a successor.
    pub fn is_episodic(&self) -> bool {
        matches!(self, ContentKind::Episode)
    }
}

/// Description of the item that follows the current one.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NextUpInfo {
    pub content_id: ContentId,
    pub title: String,
    /// Server-relative thumbnail reference; resolving it is the UI's job.
    pub thumbnail_ref: Option<String>,
    /// Short display label, e.g. `S2:E5`.
    pub label: String,
}
