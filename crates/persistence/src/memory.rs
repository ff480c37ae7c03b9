use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    EntityId, EntityVersion, PersistenceError, Result,
    store::{ChangeOp, DataStore, RecordChange, StoredRecord},
};

type RecordKey = (String, EntityId);

/// In-memory aggregate store for testing.
///
/// Stores records in a map behind a single write lock, so a save batch is
/// atomic and version checks happen under the same lock as the writes. Row
/// versions are assigned from a store-wide counter, encoded as 8 big-endian
/// bytes the way a relational rowversion column would be.
#[derive(Clone, Default)]
pub struct InMemoryDataStore {
    records: Arc<RwLock<HashMap<RecordKey, StoredRecord>>>,
    row_version: Arc<AtomicU64>,
}

impl InMemoryDataStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of records stored.
    pub async fn record_count(&self) -> usize {
        self.records.read().await.len()
    }

    /// Clears all records.
    pub async fn clear(&self) {
        self.records.write().await.clear();
    }

    fn next_version(&self) -> EntityVersion {
        let value = self.row_version.fetch_add(1, Ordering::SeqCst) + 1;
        EntityVersion::from_bytes(value.to_be_bytes().to_vec())
    }

    fn mismatch(change: &RecordChange) -> PersistenceError {
        PersistenceError::VersionMismatch {
            aggregate_type: change.record.aggregate_type.clone(),
            aggregate_id: change.record.id,
        }
    }
}

#[async_trait]
impl DataStore for InMemoryDataStore {
    async fn fetch(&self, aggregate_type: &str, id: EntityId) -> Result<Option<StoredRecord>> {
        let records = self.records.read().await;
        Ok(records
            .get(&(aggregate_type.to_string(), id))
            .cloned())
    }

    async fn exists(&self, aggregate_type: &str, id: EntityId) -> Result<bool> {
        let records = self.records.read().await;
        Ok(records.contains_key(&(aggregate_type.to_string(), id)))
    }

    async fn save(&self, changes: Vec<RecordChange>) -> Result<Vec<(EntityId, EntityVersion)>> {
        let mut records = self.records.write().await;

        // Phase one: check every version claim against the stored rows.
        for change in &changes {
            let key = (change.record.aggregate_type.clone(), change.record.id);
            match change.op {
                ChangeOp::Insert => {
                    if records.contains_key(&key) {
                        return Err(Self::mismatch(change));
                    }
                }
                ChangeOp::Update | ChangeOp::Delete => match records.get(&key) {
                    Some(stored) if stored.version == change.record.version => {}
                    _ => return Err(Self::mismatch(change)),
                },
            }
        }

        // Referential check against the post-commit row set.
        let mut surviving: HashSet<RecordKey> = records.keys().cloned().collect();
        for change in &changes {
            let key = (change.record.aggregate_type.clone(), change.record.id);
            match change.op {
                ChangeOp::Insert | ChangeOp::Update => {
                    surviving.insert(key);
                }
                ChangeOp::Delete => {
                    surviving.remove(&key);
                }
            }
        }
        for change in &changes {
            if matches!(change.op, ChangeOp::Delete) {
                continue;
            }
            for reference in &change.references {
                let key = (reference.aggregate_type.to_string(), reference.id);
                if !surviving.contains(&key) {
                    return Err(PersistenceError::ReferenceNotFound {
                        aggregate_type: change.record.aggregate_type.clone(),
                        aggregate_id: change.record.id,
                        referenced_type: reference.aggregate_type.to_string(),
                        referenced_id: reference.id,
                    });
                }
            }
        }

        // Apply, assigning fresh row versions to inserts and updates.
        let mut assigned = Vec::with_capacity(changes.len());
        for change in changes {
            let key = (change.record.aggregate_type.clone(), change.record.id);
            match change.op {
                ChangeOp::Insert | ChangeOp::Update => {
                    let mut record = change.record;
                    record.version = self.next_version();
                    assigned.push((record.id, record.version.clone()));
                    records.insert(key, record);
                }
                ChangeOp::Delete => {
                    records.remove(&key);
                }
            }
        }

        Ok(assigned)
    }
}
