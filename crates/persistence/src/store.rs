use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};

use crate::{AggregateRef, AggregateRoot, EntityId, EntityVersion, Result};

/// An aggregate as the store sees it: one JSON document per root, children
/// included, plus the store-assigned row version.
#[derive(Debug, Clone)]
pub struct StoredRecord {
    /// Identity of the aggregate root.
    pub id: EntityId,

    /// Type tag partitioning the store (e.g. "Dish", "Meal").
    pub aggregate_type: String,

    /// The serialized aggregate state.
    pub payload: serde_json::Value,

    /// Row version at the time the record was read, or the version the
    /// caller claims when writing.
    pub version: EntityVersion,
}

impl StoredRecord {
    /// Serializes an aggregate into its stored form.
    pub fn from_aggregate<A>(aggregate: &A) -> Result<Self>
    where
        A: AggregateRoot + Serialize,
    {
        Ok(Self {
            id: aggregate.id(),
            aggregate_type: A::aggregate_type().to_string(),
            payload: serde_json::to_value(aggregate)?,
            version: aggregate.version().clone(),
        })
    }

    /// Deserializes the record into a concrete aggregate, adopting the
    /// stored row version.
    pub fn into_aggregate<A>(self) -> Result<A>
    where
        A: AggregateRoot + DeserializeOwned,
    {
        let mut aggregate: A = serde_json::from_value(self.payload)?;
        aggregate.set_version(self.version);
        Ok(aggregate)
    }
}

/// The kind of change staged against a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOp {
    /// A new row; the claimed version is ignored.
    Insert,
    /// A version-checked wholesale replacement.
    Update,
    /// A version-checked delete.
    Delete,
}

/// A single staged change handed to [`DataStore::save`].
#[derive(Debug, Clone)]
pub struct RecordChange {
    /// What to do with the record.
    pub op: ChangeOp,

    /// The record, carrying the caller's claimed version for updates and
    /// deletes.
    pub record: StoredRecord,

    /// References the record's aggregate declares; the store re-checks them
    /// inside its transactional boundary.
    pub references: Vec<AggregateRef>,
}

/// Storage backend for aggregate records.
///
/// Implementations must be thread-safe; these three calls are the only
/// suspension points in the persistence core.
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Fetches the current record for an aggregate, or None.
    async fn fetch(&self, aggregate_type: &str, id: EntityId) -> Result<Option<StoredRecord>>;

    /// Returns true if a record currently exists.
    async fn exists(&self, aggregate_type: &str, id: EntityId) -> Result<bool>;

    /// Applies a batch of changes atomically.
    ///
    /// Every `Update` and `Delete` is checked against the stored row
    /// version, and every declared reference must resolve to a surviving
    /// row. On any `VersionMismatch` or `ReferenceNotFound` nothing is
    /// applied. Returns the freshly assigned version for each row that
    /// survives the commit (inserts and updates).
    async fn save(&self, changes: Vec<RecordChange>) -> Result<Vec<(EntityId, EntityVersion)>>;
}
