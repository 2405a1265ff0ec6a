//! Opaque optimistic-concurrency token

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::DomainError;

/// Marker stamped by the store on every committed write of a versioned row.
///
/// Tokens are compared by byte equality only. They have no ordering and are
/// never incremented or built by application code: the crate reads them back
/// from the store, and callers hand them back unchanged (usually as hex) as the
/// expected version of a pending update.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct VersionToken(Vec<u8>);

impl VersionToken {
    /// Wrap bytes read from a `row_version` column.
    pub(crate) fn from_store(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Parse a token previously rendered with `to_hex` / `Display`.
    pub fn from_hex(value: &str) -> Result<Self, DomainError> {
        let trimmed = value.trim().trim_matches('"');
        hex::decode(trimmed)
            .map(Self)
            .map_err(|e| DomainError::Validation(format!("malformed version token: {}", e)))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VersionToken({})", self.to_hex())
    }
}

impl Serialize for VersionToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for VersionToken {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        VersionToken::from_hex(&raw).map_err(serde::de::Error::custom)
    }
}
