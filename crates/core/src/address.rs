//! Address - identity of every actor in the ledger
//!
//! Airlines, insurees, oracles, coordinating services and the owner are all
//! identified by an `Address`. Addresses are case-insensitive: they are
//! trimmed and lower-cased on construction.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Create a new address.
    ///
    /// Rejects empty identities and identities containing whitespace or `:`
    /// (reserved as a separator in log output).
    pub fn new(value: impl AsRef<str>) -> Result<Self, CoreError> {
        let normalized = value.as_ref().trim().to_lowercase();
        if normalized.is_empty()
            || normalized.chars().any(|c| c.is_whitespace() || c == ':')
        {
            return Err(CoreError::InvalidAddress(value.as_ref().to_string()));
        }
        Ok(Self(normalized))
    }

    /// Create an address without validation.
    ///
    /// The caller MUST pass an already normalized, non-empty identity.
    /// Use only for trusted literals (e.g., configuration defaults).
    pub fn new_unchecked(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Address {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
