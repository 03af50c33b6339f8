//! Canonical, cross-crate types for the Kennel Chain code-base.
//!
//! This module is **dependency-light** and **stable**, making it safe to be
//! imported by every service crate and test harness without dragging in the
//! minting domain itself.

use std::{fmt, str::FromStr};

use hex::{FromHex, ToHex};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fee / balance amount in the smallest native denomination (wei).
pub type TokenAmount = u128;

/// Result alias pre-filled with [`KcCommonError`].
pub type Result<T, E = KcCommonError> = std::result::Result<T, E>;

/// Error type shared by helpers contained in this crate.
///
/// The enum is kept deliberately small; specialised subsystems create their
/// own error enums and `#[from]` this one where needed.
#[derive(Debug, Error)]
pub enum KcCommonError {
    /// Malformed address or ID strings.
    #[error("malformed data: {0}")]
    Malformed(String),

    /// Hex decoding failure.
    #[error(transparent)]
    Hex(#[from] hex::FromHexError),
}

/// A 20-byte account address.
///
/// Display/parse as lowercase, "0x"-prefixed hex string; serialised in the
/// same string form so addresses are readable in config files and JSON
/// payloads.
#[derive(Copy, Clone, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Address([u8; 20]);

impl Address {
    pub const LEN: usize = 20;

    #[inline]
    pub fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// The all-zero address, conventionally "nobody".
    #[inline]
    pub fn zero() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.0.encode_hex::<String>())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for Address {
    type Err = KcCommonError;

    fn from_str(s: &str) -> Result<Self> {
        let raw = s.strip_prefix("0x").unwrap_or(s).to_ascii_lowercase();

        if raw.len() != Self::LEN * 2 {
            return Err(KcCommonError::Malformed(format!(
                "address length mismatch (expected {} hex chars, got {})",
                Self::LEN * 2,
                raw.len()
            )));
        }

        let bytes = <[u8; Self::LEN]>::from_hex(raw)?;
        Ok(Self(bytes))
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error as _;
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }
}

/// Sequential identifier of a minted asset, assigned by the asset registry
/// starting at `#0` and never reused.
#[derive(
    Copy, Clone, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TokenId(pub u64);

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for TokenId {
    fn from(v: u64) -> Self {
        TokenId(v)
    }
}

impl From<TokenId> for u64 {
    fn from(v: TokenId) -> Self {
        v.0
    }
}

/// Opaque token correlating a randomness request with its eventual
/// fulfillment.
///
/// Issued by the randomness provider; the minting side never fabricates one
/// and only compares them for equality.
#[derive(
    Copy, Clone, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<u64> for RequestId {
    fn from(v: u64) -> Self {
        RequestId(v)
    }
}
