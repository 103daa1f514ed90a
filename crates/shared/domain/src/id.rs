//! Store-assigned entity identifiers.

use std::fmt;
use std::str::FromStr;

use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::{DomainError, DomainResult};

/// A 12-byte object id, written as 24 lowercase hex characters.
///
/// Immutable once assigned; unique within its collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(ObjectId);

impl EntityId {
    /// Generate a new id (timestamp, process-unique random, counter).
    pub fn new() -> Self {
        EntityId(ObjectId::new())
    }

    /// Parse a 24-character hex string.
    pub fn parse(hex: &str) -> DomainResult<Self> {
        ObjectId::parse_str(hex)
            .map(EntityId)
            .map_err(|e| DomainError::invalid_id(format!("{}: {}", hex, e)))
    }

    pub fn to_hex(&self) -> String {
        self.0.to_hex()
    }

    pub fn bytes(&self) -> [u8; 12] {
        self.0.bytes()
    }

    /// Creation time embedded in the id (second precision).
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.0.timestamp().timestamp_millis())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for EntityId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<EntityId> for Value {
    fn from(id: EntityId) -> Self {
        Value::String(id.to_hex())
    }
}

impl From<&EntityId> for Value {
    fn from(id: &EntityId) -> Self {
        Value::String(id.to_hex())
    }
}

impl Serialize for EntityId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        EntityId::parse(&hex).map_err(de::Error::custom)
    }
}
