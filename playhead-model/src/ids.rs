use std::fmt;

use crate::error::{ModelError, Result};

/// Opaque identifier of a playable item on the remote media server.
///
/// The orchestrator never interprets the value; it is handed back verbatim
/// to the server and the watch-history service.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ContentId(String);

impl ContentId {
    pub fn new(raw: impl Into<String>) -> Self {
        ContentId(raw.into())
    }

    /// Build an id, rejecting empty or whitespace-only input.
    pub fn parse(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(ModelError::InvalidId(
                "content id must not be empty".to_string(),
            ));
        }
        Ok(ContentId(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ContentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ContentId {
    fn from(value: &str) -> Self {
        ContentId::new(value)
    }
}

impl From<String> for ContentId {
    fn from(value: String) -> Self {
        ContentId(value)
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a server-side transcode session.
///
/// An empty value means "not assigned yet"; stopping an empty session is a
/// no-op.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ServerSessionId(String);

impl ServerSessionId {
    pub fn new(raw: impl Into<String>) -> Self {
        ServerSessionId(raw.into())
    }

    pub fn empty() -> Self {
        ServerSessionId(String::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServerSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_blank_content_ids() {
        assert!(ContentId::parse("  ").is_err());
        assert_eq!(ContentId::parse("4821").unwrap().as_str(), "4821");
    }

    #[test]
    fn whitespace_session_id_counts_as_empty() {
        assert!(ServerSessionId::empty().is_empty());
        assert!(ServerSessionId::new(" ").is_empty());
        assert!(!ServerSessionId::new("abc").is_empty());
    }
}
