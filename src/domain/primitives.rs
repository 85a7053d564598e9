//! Domain primitives: Address, TimeSec.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Time in seconds since Unix epoch, as reported by the explorer.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TimeSec(pub i64);

impl TimeSec {
    /// Create a TimeSec from seconds.
    pub fn new(secs: i64) -> Self {
        TimeSec(secs)
    }

    /// Current wall-clock time.
    pub fn now() -> Self {
        TimeSec(Utc::now().timestamp())
    }

    /// Get the underlying seconds value.
    pub fn as_secs(&self) -> i64 {
        self.0
    }

    /// Absolute distance in seconds.
    pub fn distance(&self, other: TimeSec) -> i64 {
        (self.0 - other.0).abs()
    }

    /// UTC datetime, or `None` when out of chrono's range.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp(self.0, 0)
    }
}

/// Wallet or contract address (hex string), normalized to lowercase.
///
/// Every comparison between addresses in this crate is case-insensitive; normalizing once on
/// construction keeps `==` and hashing consistent with that.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address(String);

impl Address {
    /// Create an Address from a string. No validation beyond normalization.
    pub fn new(addr: impl AsRef<str>) -> Self {
        Address(addr.as_ref().trim().to_ascii_lowercase())
    }

    /// Get the address as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the address begins with `prefix` (compared case-insensitively).
    pub fn has_prefix(&self, prefix: &str) -> bool {
        let prefix = prefix.trim();
        !prefix.is_empty() && self.0.starts_with(&prefix.to_ascii_lowercase())
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressParseError {
    #[error("address is empty")]
    Empty,
    #[error("address must start with 0x: {0}")]
    MissingPrefix(String),
    #[error("address must be 40 hex characters after 0x: {0}")]
    InvalidHex(String),
}

impl FromStr for Address {
    type Err = AddressParseError;

    /// Strict parse used at the HTTP boundary: `0x` followed by 40 hex digits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AddressParseError::Empty);
        }
        let Some(hex_part) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) else {
            return Err(AddressParseError::MissingPrefix(s.to_string()));
        };
        if hex_part.len() != 40 || !hex_part.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(AddressParseError::InvalidHex(s.to_string()));
        }
        Ok(Address::new(s))
    }
}
