//! Storage entity traits

use std::fmt::Debug;

use serde::{de::DeserializeOwned, Serialize};

/// Trait for types that can be used as storage keys
pub trait StorageKey: Clone + Debug + Send + Sync + Eq + std::hash::Hash {
    /// Returns the key as a string for storage backends that require string keys
    fn as_str(&self) -> &str;
}

/// Trait for types that can be stored
pub trait StorageEntity: Clone + Debug + Send + Sync + Serialize + DeserializeOwned {
    /// The key type for this entity
    type Key: StorageKey;

    /// Returns the entity's key
    fn key(&self) -> &Self::Key;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
    struct TagKey(String);

    impl StorageKey for TagKey {
        fn as_str(&self) -> &str {
            &self.0
        }
    }

    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    struct Tagged {
        id: TagKey,
        label: String,
    }

    impl StorageEntity for Tagged {
        type Key = TagKey;

        fn key(&self) -> &Self::Key {
            &self.id
        }
    }

    #[test]
    fn test_entity_key_round_trips_through_as_str() {
        let entity = Tagged {
            id: TagKey("shed-1".to_string()),
            label: "Main shed".to_string(),
        };
        assert_eq!(entity.key().as_str(), "shed-1");
        assert_eq!(entity.label, "Main shed");
    }
}
