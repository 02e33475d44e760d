//! Document identifiers
//!
//! An `ObjectId` is 12 opaque bytes:
//!
//! - 4 bytes: creation time in seconds since the Unix epoch (big-endian)
//! - 5 bytes: random value fixed for the lifetime of the process
//! - 3 bytes: counter, seeded randomly and incremented per id (big-endian)
//!
//! Ids generated in the same second by the same process therefore sort in
//! generation order, and concurrent generators never collide. The canonical
//! string form is 24 lower-case hex characters.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use uuid::Uuid;

/// Number of bytes in an id
pub const OBJECT_ID_LEN: usize = 12;

const COUNTER_MASK: u32 = 0x00ff_ffff;

/// Errors that can occur when parsing an id
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ObjectIdError {
    #[error("Invalid id length: expected 24 hex characters, got {0}")]
    InvalidLength(usize),

    #[error("Invalid id: not a hex string")]
    InvalidHex,
}

/// Opaque, globally unique document identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId([u8; OBJECT_ID_LEN]);

impl ObjectId {
    /// Generate a fresh id
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let seconds = Utc::now().timestamp().clamp(0, u32::MAX as i64) as u32;
        Self::from_parts(seconds, process_unique(), next_counter())
    }

    /// Build an id from raw bytes
    pub const fn from_bytes(bytes: [u8; OBJECT_ID_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse an id from its hex representation
    pub fn parse_str(s: &str) -> Result<Self, ObjectIdError> {
        let s = s.trim();
        if s.len() != OBJECT_ID_LEN * 2 {
            return Err(ObjectIdError::InvalidLength(s.len()));
        }

        let mut bytes = [0u8; OBJECT_ID_LEN];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| ObjectIdError::InvalidHex)?;
        Ok(Self(bytes))
    }

    /// Raw bytes of the id
    pub fn bytes(&self) -> [u8; OBJECT_ID_LEN] {
        self.0
    }

    /// Lower-case hex representation
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Creation time embedded in the id (second precision)
    pub fn timestamp(&self) -> DateTime<Utc> {
        let seconds = u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]]);
        Utc.timestamp_opt(i64::from(seconds), 0)
            .single()
            .unwrap_or_default()
    }

    fn from_parts(seconds: u32, unique: [u8; 5], counter: u32) -> Self {
        let mut bytes = [0u8; OBJECT_ID_LEN];
        bytes[..4].copy_from_slice(&seconds.to_be_bytes());
        bytes[4..9].copy_from_slice(&unique);
        bytes[9..].copy_from_slice(&counter.to_be_bytes()[1..]);
        Self(bytes)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = ObjectIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_str(s)
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ObjectId::parse_str(&s).map_err(serde::de::Error::custom)
    }
}

fn process_unique() -> [u8; 5] {
    static UNIQUE: OnceLock<[u8; 5]> = OnceLock::new();
    *UNIQUE.get_or_init(|| {
        let random = Uuid::new_v4();
        let mut unique = [0u8; 5];
        unique.copy_from_slice(&random.as_bytes()[..5]);
        unique
    })
}

fn next_counter() -> u32 {
    static COUNTER: OnceLock<AtomicU32> = OnceLock::new();
    let counter = COUNTER.get_or_init(|| {
        let random = Uuid::new_v4();
        let b = random.as_bytes();
        AtomicU32::new(u32::from_be_bytes([0, b[0], b[1], b[2]]))
    });
    counter.fetch_add(1, Ordering::Relaxed) & COUNTER_MASK
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_hex_roundtrip() {
        let id = ObjectId::new();
        let hex = id.to_hex();
        assert_eq!(hex.len(), 24);
        assert_eq!(ObjectId::parse_str(&hex).unwrap(), id);
        assert_eq!(id.to_string(), hex);
    }

    #[test]
    fn test_parse_accepts_upper_case() {
        let id = ObjectId::parse_str("65F0A1B2C3D4E5F601020304").unwrap();
        assert_eq!(id.to_hex(), "65f0a1b2c3d4e5f601020304");
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!(
            ObjectId::parse_str("abc"),
            Err(ObjectIdError::InvalidLength(3))
        );
        assert_eq!(
            ObjectId::parse_str("zzzzzzzzzzzzzzzzzzzzzzzz"),
            Err(ObjectIdError::InvalidHex)
        );
    }

    #[test]
    fn test_ids_are_unique() {
        let ids: Vec<_> = (0..1000).map(|_| ObjectId::new()).collect();
        let unique: HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());
    }

    #[test]
    fn test_concurrent_generation_is_unique() {
        let handles: Vec<_> = (0..8)
            .map(|_| std::thread::spawn(|| (0..500).map(|_| ObjectId::new()).collect::<Vec<_>>()))
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate id {}", id);
            }
        }
        assert_eq!(seen.len(), 4000);
    }

    #[test]
    fn test_timestamp_is_embedded() {
        let before = Utc::now().timestamp();
        let id = ObjectId::new();
        let after = Utc::now().timestamp();
        let ts = id.timestamp().timestamp();
        assert!(ts >= before && ts <= after);
    }

    #[test]
    fn test_from_parts_layout() {
        let id = ObjectId::from_parts(1, [2, 3, 4, 5, 6], 0x0007_0809);
        assert_eq!(id.bytes(), [0, 0, 0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn test_serde_as_hex_string() {
        let id = ObjectId::from_bytes([0xab; 12]);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"abababababababababababab\"");

        let parsed: ObjectId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);

        assert!(serde_json::from_str::<ObjectId>("\"nope\"").is_err());
        assert!(serde_json::from_str::<ObjectId>("42").is_err());
    }
}
