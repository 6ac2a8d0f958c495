//! Serialization strategies for structured cache values.

use crate::error::{CacheError, CacheResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de::DeserializeOwned};
use std::fmt;
use std::str::FromStr;

/// Codec used to turn structured values into stored bytes.
///
/// The set of strategies is closed. Values coming from outside the type
/// system (numeric codes, names in configuration) are checked on conversion
/// and rejected with [`CacheError::InvalidOptions`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Serialization {
    /// Self-describing JSON text.
    #[default]
    Json = 0,
    /// Compact MessagePack with named struct fields.
    MessagePack = 1,
}

impl Serialization {
    /// All supported strategies.
    pub const ALL: [Serialization; 2] = [Serialization::Json, Serialization::MessagePack];

    /// Whether `code` names a supported strategy.
    pub fn is_valid(code: u8) -> bool {
        Self::try_from(code).is_ok()
    }

    /// Lowercase name used in configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            Serialization::Json => "json",
            Serialization::MessagePack => "msgpack",
        }
    }

    /// Encode a value.
    pub fn encode<T: Serialize + ?Sized>(&self, value: &T) -> CacheResult<Vec<u8>> {
        match self {
            Serialization::Json => {
                serde_json::to_vec(value).map_err(|e| CacheError::Serialization(e.to_string()))
            }
            Serialization::MessagePack => rmp_serde::to_vec_named(value)
                .map_err(|e| CacheError::Serialization(e.to_string())),
        }
    }

    /// Decode bytes into `T`.
    pub fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> CacheResult<T> {
        match self {
            Serialization::Json => {
                serde_json::from_slice(data).map_err(|e| CacheError::Deserialization(e.to_string()))
            }
            Serialization::MessagePack => {
                rmp_serde::from_slice(data).map_err(|e| CacheError::Deserialization(e.to_string()))
            }
        }
    }
}

impl TryFrom<u8> for Serialization {
    type Error = CacheError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Serialization::Json),
            1 => Ok(Serialization::MessagePack),
            other => Err(CacheError::InvalidOptions(format!(
                "unknown serialization code {}",
                other
            ))),
        }
    }
}

impl FromStr for Serialization {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(Serialization::Json),
            "msgpack" | "messagepack" => Ok(Serialization::MessagePack),
            other => Err(CacheError::InvalidOptions(format!(
                "unknown serialization '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for Serialization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Serialization {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Serialization {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}
