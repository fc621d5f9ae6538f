use playhead_model::{ContentId, Marker, MarkerKind, NextUpInfo};
use serde::Deserialize;

/// Every Plex JSON response is wrapped in a `MediaContainer`.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    #[serde(rename = "MediaContainer")]
    pub media_container: T,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DecisionContainer {
    pub general_decision_code: Option<u32>,
    pub general_decision_text: Option<String>,
    #[serde(rename = "Metadata", default)]
    pub metadata: Vec<PlexMetadata>,
}

impl DecisionContainer {
    /// Codes from 2000 up are refusals.
    pub fn refusal(&self) -> Option<String> {
        if self.metadata.is_empty() {
            return Some(
                self.general_decision_text
                    .clone()
                    .unwrap_or_else(|| "no playable media".to_string()),
            );
        }
        match self.general_decision_code {
            Some(code) if code >= 2000 => Some(format!(
                "decision {code}: {}",
                self.general_decision_text.as_deref().unwrap_or("refused")
            )),
            _ => None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct MetadataContainer {
    #[serde(rename = "Metadata", default)]
    pub metadata: Vec<PlexMetadata>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PlexMetadata {
    pub rating_key: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub title: Option<String>,
    pub thumb: Option<String>,
    pub grandparent_rating_key: Option<String>,
    pub parent_index: Option<u32>,
    pub index: Option<u32>,
    #[serde(rename = "Marker", default)]
    pub markers: Vec<PlexMarker>,
}

impl PlexMetadata {
    pub fn is_episode(&self) -> bool {
        self.kind.as_deref() == Some("episode")
    }

    pub fn to_markers(&self) -> Vec<Marker> {
        self.markers
            .iter()
            .filter_map(|marker| {
                let kind = match marker.kind.as_str() {
                    "intro" => MarkerKind::Intro,
                    "credits" => MarkerKind::Credits,
                    _ => MarkerKind::Custom,
                };
                Marker::new(kind, marker.start_time_offset, marker.end_time_offset)
                    .ok()
            })
            .collect()
    }

    pub fn to_next_up(&self) -> Option<NextUpInfo> {
        let rating_key = self.rating_key.as_deref()?;
        let label = match (self.parent_index, self.index) {
            (Some(season), Some(episode)) => format!("S{season}:E{episode}"),
            _ => String::new(),
        };
        Some(NextUpInfo {
            content_id: ContentId::new(rating_key),
            title: self.title.clone().unwrap_or_default(),
            thumbnail_ref: self.thumb.clone(),
            label,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PlexMarker {
    #[serde(rename = "type")]
    pub kind: String,
    pub start_time_offset: u64,
    pub end_time_offset: u64,
}
