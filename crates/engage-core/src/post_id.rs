//! Numeric post identifiers.
//!
//! The upstream encodes post ids as decimal strings of varying length, so
//! `"999" < "1000"` must hold. Comparing the strings lexically gets that
//! wrong; [`PostId`] parses to `u64` and orders numerically.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PostId(u64);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid post id '{0}': expected a decimal integer")]
pub struct ParsePostIdError(pub String);

impl PostId {
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Returns the numerically greatest id, or `None` for an empty iterator.
    pub fn newest<I>(ids: I) -> Option<Self>
    where
        I: IntoIterator<Item = Self>,
    {
        ids.into_iter().max()
    }
}

impl FromStr for PostId {
    type Err = ParsePostIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParsePostIdError(s.to_string()));
        }
        trimmed
            .parse::<u64>()
            .map(Self)
            .map_err(|_| ParsePostIdError(s.to_string()))
    }
}

impl TryFrom<String> for PostId {
    type Error = ParsePostIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PostId> for String {
    fn from(value: PostId) -> Self {
        value.to_string()
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
