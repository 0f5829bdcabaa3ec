//! Entity transaction types
//!
//! Every entity mutation is classified as exactly one of these. Values are
//! persisted and logged as plain integers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Classification of an entity mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum EntityTransactionType {
    Creation = 1,
    Deletion = 2,
    Modification = 3,
    /// Soft delete: the entity keeps its data in the recycle bin
    Recycling = 4,
}

impl EntityTransactionType {
    /// Decode a persisted value; unknown values yield `None`
    pub fn from_raw(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Creation),
            2 => Some(Self::Deletion),
            3 => Some(Self::Modification),
            4 => Some(Self::Recycling),
            _ => None,
        }
    }

    pub fn as_raw(self) -> u8 {
        self as u8
    }

    /// Listeners may forget the entity only for a hard deletion
    pub fn is_permanent_removal(self) -> bool {
        self == Self::Deletion
    }
}

impl fmt::Display for EntityTransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Creation => "Creation",
            Self::Deletion => "Deletion",
            Self::Modification => "Modification",
            Self::Recycling => "Recycling",
        };
        f.write_str(name)
    }
}

impl From<EntityTransactionType> for u8 {
    fn from(value: EntityTransactionType) -> Self {
        value.as_raw()
    }
}

impl TryFrom<u8> for EntityTransactionType {
    type Error = ModelError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_raw(value).ok_or(ModelError::UnknownTransactionType(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_values() {
        assert_eq!(EntityTransactionType::Creation.as_raw(), 1);
        assert_eq!(EntityTransactionType::Deletion.as_raw(), 2);
        assert_eq!(EntityTransactionType::Modification.as_raw(), 3);
        assert_eq!(EntityTransactionType::Recycling.as_raw(), 4);
        assert_eq!(
            EntityTransactionType::from_raw(4),
            Some(EntityTransactionType::Recycling)
        );
    }

    #[test]
    fn test_unknown_values_are_ignored() {
        assert_eq!(EntityTransactionType::from_raw(0), None);
        assert_eq!(EntityTransactionType::from_raw(9), None);
        assert!(serde_json::from_str::<EntityTransactionType>("9").is_err());
    }

    #[test]
    fn test_recycling_is_not_permanent() {
        assert!(EntityTransactionType::Deletion.is_permanent_removal());
        assert!(!EntityTransactionType::Recycling.is_permanent_removal());
    }

    #[test]
    fn test_serializes_as_integer() {
        let json = serde_json::to_string(&EntityTransactionType::Recycling).unwrap();
        assert_eq!(json, "4");
    }
}
