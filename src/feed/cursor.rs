use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

use super::timestamp;

const SEPARATOR: char = '~';

/// Position in the feed: the last post a client has already seen.
///
/// Wire form is `<timestamp>` or `<timestamp>~<post id>`. A bare timestamp
/// selects posts strictly older than it; with an id, posts sharing that
/// timestamp but sorting after the id are selected too.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedCursor {
    pub created_at: DateTime<Utc>,
    pub id: Option<String>,
}

#[derive(Debug, thiserror::Error)]
#[error("invalid cursor: {0}")]
pub struct CursorError(String);

impl FeedCursor {
    pub fn after(created_at: DateTime<Utc>, id: impl Into<String>) -> Self {
        Self {
            created_at,
            id: Some(id.into()),
        }
    }

    pub fn created_at_text(&self) -> String {
        timestamp::format(&self.created_at)
    }
}

impl FromStr for FeedCursor {
    type Err = CursorError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        let (ts, id) = match raw.rsplit_once(SEPARATOR) {
            Some((ts, id)) if !id.is_empty() => (ts, Some(id.to_string())),
            Some(_) => return Err(CursorError(raw.to_string())),
            None => (raw, None),
        };

        let created_at = timestamp::parse(ts).map_err(|_| CursorError(raw.to_string()))?;
        Ok(Self { created_at, id })
    }
}

impl fmt::Display for FeedCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{}{}{}", self.created_at_text(), SEPARATOR, id),
            None => f.write_str(&self.created_at_text()),
        }
    }
}

impl serde::Serialize for FeedCursor {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
