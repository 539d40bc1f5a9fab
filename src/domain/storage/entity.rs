//! Storage entity traits and types

use std::fmt::Debug;

use serde::{de::DeserializeOwned, Serialize};

/// Trait for types that can be used as document keys
pub trait StorageKey: Clone + Debug + Send + Sync + Eq + std::hash::Hash {
    /// Returns the key as a string for backends that require string keys
    fn as_str(&self) -> &str;
}

/// Trait for documents persisted in a named collection
pub trait StorageEntity: Clone + Debug + Send + Sync + Serialize + DeserializeOwned {
    /// The key type for this entity
    type Key: StorageKey;

    /// Collection (table) the documents live in
    const COLLECTION: &'static str;

    /// Returns the entity's key
    fn key(&self) -> &Self::Key;
}

/// Check whether a document's top-level string field equals `value`
pub fn field_matches<E: Serialize>(entity: &E, field: &str, value: &str) -> bool {
    serde_json::to_value(entity)
        .ok()
        .and_then(|doc| doc.get(field).and_then(|v| v.as_str()).map(|v| v == value))
        .unwrap_or(false)
}
