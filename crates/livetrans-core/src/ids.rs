use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const PREFIX: &str = "sess_";

/// Identifier of one client session.
///
/// Allocated from a monotonically increasing counter owned by the session
/// registry, so a value is never handed out twice within a process lifetime.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(u64);

impl SessionId {
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    /// The identifier after this one, or `None` once the space is used up.
    pub fn checked_next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{PREFIX}{}", self.0)
    }
}

/// Error returned when parsing a malformed session id.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid session id: {0}")]
pub struct ParseSessionIdError(String);

impl FromStr for SessionId {
    type Err = ParseSessionIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix(PREFIX).unwrap_or(s);
        digits
            .parse::<u64>()
            .map(Self)
            .map_err(|_| ParseSessionIdError(s.to_owned()))
    }
}
