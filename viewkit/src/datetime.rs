use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// A point in time, persisted as a decimal string of Unix seconds (e.g.
/// `"1749746283"`).
///
/// Documents written by other tools may carry an empty or otherwise
/// unparseable timestamp, so the raw string is kept as-is and only
/// interpreted on demand.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(String);

impl Timestamp {
    /// The current time.
    pub fn now() -> Self {
        OffsetDateTime::now_utc().into()
    }

    pub fn from_unix(secs: i64) -> Self {
        Self(secs.to_string())
    }

    /// The number of seconds since the Unix epoch, if this timestamp holds a
    /// valid one.
    pub fn unix(&self) -> Option<i64> {
        i64::from_str(&self.0).ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Renders this timestamp in RFC 3339 format (UTC), falling back to the
    /// raw string if it cannot be interpreted.
    pub fn to_rfc3339(&self) -> String {
        self.unix()
            .and_then(|secs| OffsetDateTime::from_unix_timestamp(secs).ok())
            .and_then(|dt| dt.format(&Rfc3339).ok())
            .unwrap_or_else(|| self.0.clone())
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<OffsetDateTime> for Timestamp {
    fn from(dt: OffsetDateTime) -> Self {
        Self::from_unix(dt.unix_timestamp())
    }
}

impl From<&str> for Timestamp {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
