use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for any stored row (UUID v4, assigned by the backend)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct RecordId(Uuid);

#[derive(Debug, Error)]
pub enum IdParseError {
    #[error("invalid record id: {0}")]
    InvalidUuid(#[from] uuid::Error),
}

impl RecordId {
    /// Generate a fresh random id
    pub fn generate() -> Self {
        RecordId(Uuid::new_v4())
    }

    /// Parse an id from its canonical string form
    pub fn parse(s: &str) -> Result<Self, IdParseError> {
        Ok(RecordId(Uuid::parse_str(s)?))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for RecordId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordId::parse(s)
    }
}

impl From<Uuid> for RecordId {
    fn from(u: Uuid) -> Self {
        RecordId(u)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_unique() {
        let a = RecordId::generate();
        let b = RecordId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_parse_roundtrip() {
        let id = RecordId::generate();
        let parsed = RecordId::parse(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(RecordId::parse("not-a-uuid").is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let id = RecordId::generate();
        let json = serde_json::to_value(id).unwrap();
        assert_eq!(json, serde_json::Value::String(id.to_string()));
    }
}
