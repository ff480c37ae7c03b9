//! The transactional boundary for aggregate persistence.
//!
//! Repositories only stage intent; all I/O against the durable store happens
//! in [`UnitOfWork::commit`], which runs the deferred validator pass over the
//! staged aggregates and then attempts the physical save, translating
//! store-level optimistic-lock failures into [`PersistenceError::ConcurrentUpdate`].

use std::any::Any;
use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use common::EntityId;
use serde::{Serialize, de::DeserializeOwned};

use crate::{
    AggregateRef, AggregateRoot, EntityVersion, PersistenceError, Result,
    store::{ChangeOp, DataStore, RecordChange, StoredRecord},
    validator::{StagedAggregate, ValidationLookup, ValidatorRegistry},
};

/// Per-aggregate-type persistence port.
///
/// Implemented by [`UnitOfWork`] for every aggregate that can be serialized
/// as a whole document. `get_single_by_id` is the only method that reads the
/// store; `add`, `update` and `remove` stage work for the next `commit`.
#[async_trait]
pub trait Repository<A>
where
    A: AggregateRoot + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Loads an aggregate with its current store version, or None.
    ///
    /// Loading records the identity in the session, which is the
    /// precondition for a later `update` of the same aggregate.
    async fn get_single_by_id(&mut self, id: EntityId) -> Result<Option<A>>;

    /// Stages an insert.
    fn add(&mut self, aggregate: A) -> Result<()>;

    /// Stages a version-checked wholesale replacement.
    ///
    /// The aggregate must have been loaded through this unit of work
    /// (identity comparison), and the same identity must not already be
    /// staged. The version carried by the aggregate, typically one adopted
    /// from a client ETag, is what the store compares at commit time.
    fn update(&mut self, aggregate: A) -> Result<()>;

    /// Stages a version-checked delete.
    fn remove(&mut self, aggregate: A) -> Result<()>;
}

/// Lifecycle of a unit of work. Once committed or failed it cannot be
/// reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOfWorkState {
    /// Accepting staged operations.
    Open,
    /// Commit succeeded; all staged changes are durable.
    Committed,
    /// Commit was aborted; nothing was written.
    Failed,
}

/// Result of a successful commit: the freshly assigned row version for every
/// aggregate that survived (inserts and updates).
#[derive(Debug, Default)]
pub struct CommitReceipt {
    versions: HashMap<EntityId, EntityVersion>,
}

impl CommitReceipt {
    /// Returns the new concurrency token for an aggregate, the value a
    /// caller hands back to its client as the next ETag.
    pub fn version_of(&self, id: EntityId) -> Option<&EntityVersion> {
        self.versions.get(&id)
    }

    /// Returns the number of rows that received a new version.
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    /// Returns true if the commit wrote no surviving rows.
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

struct StagedOp {
    op: ChangeOp,
    aggregate_type: &'static str,
    record: StoredRecord,
    references: Vec<AggregateRef>,
    entity: Box<dyn Any + Send + Sync>,
}

/// A single-caller session tracking loaded identities and staged changes.
///
/// Many units of work run concurrently against the shared store with no
/// in-process locking; correctness comes from the store's version check at
/// commit. On a [`PersistenceError::ConcurrentUpdate`] the caller must
/// reload and re-apply, never resubmit the same token.
pub struct UnitOfWork<S: DataStore> {
    store: S,
    registry: ValidatorRegistry,
    state: UnitOfWorkState,
    loaded: HashSet<(&'static str, EntityId)>,
    staged: Vec<StagedOp>,
}

impl<S: DataStore> UnitOfWork<S> {
    /// Creates a unit of work over a store with the given validator
    /// registry.
    pub fn new(store: S, registry: ValidatorRegistry) -> Self {
        Self {
            store,
            registry,
            state: UnitOfWorkState::Open,
            loaded: HashSet::new(),
            staged: Vec::new(),
        }
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> UnitOfWorkState {
        self.state
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    fn ensure_open(&self) -> Result<()> {
        match self.state {
            UnitOfWorkState::Open => Ok(()),
            state => Err(PersistenceError::InvalidOperation {
                reason: format!("unit of work is {state:?} and cannot be reused"),
            }),
        }
    }

    fn ensure_not_staged(&self, aggregate_type: &'static str, id: EntityId) -> Result<()> {
        let already = self
            .staged
            .iter()
            .any(|op| op.aggregate_type == aggregate_type && op.record.id == id);
        if already {
            return Err(PersistenceError::InvalidOperation {
                reason: format!("{aggregate_type} {id} is already staged in this unit of work"),
            });
        }
        Ok(())
    }

    fn stage<A>(&mut self, op: ChangeOp, aggregate: A) -> Result<()>
    where
        A: AggregateRoot + Serialize + Send + Sync + 'static,
    {
        self.staged.push(StagedOp {
            op,
            aggregate_type: A::aggregate_type(),
            record: StoredRecord::from_aggregate(&aggregate)?,
            references: aggregate.references(),
            entity: Box::new(aggregate),
        });
        Ok(())
    }

    /// Validates and commits all staged changes.
    ///
    /// 1. Resolves every declared reference against the staged set and the
    ///    store into a synchronous lookup.
    /// 2. Runs the deferred validator pass over staged inserts and updates;
    ///    any failure aborts before anything is written.
    /// 3. Saves the batch; a store version mismatch or a reference that
    ///    vanished in the race window surfaces as `ConcurrentUpdate`.
    ///
    /// After `commit` returns the unit of work is `Committed` or `Failed`
    /// and rejects further use.
    #[tracing::instrument(skip(self), fields(staged = self.staged.len()))]
    pub async fn commit(&mut self) -> Result<CommitReceipt> {
        self.ensure_open()?;

        match self.try_commit().await {
            Ok(receipt) => {
                self.state = UnitOfWorkState::Committed;
                metrics::counter!("unit_of_work_commits").increment(1);
                Ok(receipt)
            }
            Err(err) => {
                self.state = UnitOfWorkState::Failed;
                Err(err)
            }
        }
    }

    async fn try_commit(&mut self) -> Result<CommitReceipt> {
        let lookup = self.resolve_references().await?;
        self.run_validators(&lookup)?;

        let changes: Vec<RecordChange> = self
            .staged
            .drain(..)
            .map(|op| RecordChange {
                op: op.op,
                record: op.record,
                references: op.references,
            })
            .collect();

        let assigned = self.store.save(changes).await.map_err(|err| match err {
            PersistenceError::VersionMismatch {
                aggregate_type,
                aggregate_id,
            }
            | PersistenceError::ReferenceNotFound {
                aggregate_type,
                aggregate_id,
                ..
            } => {
                metrics::counter!("unit_of_work_conflicts").increment(1);
                tracing::warn!(%aggregate_type, %aggregate_id, "optimistic concurrency conflict");
                PersistenceError::ConcurrentUpdate {
                    aggregate_type,
                    aggregate_id,
                }
            }
            other => other,
        })?;

        Ok(CommitReceipt {
            versions: assigned.into_iter().collect(),
        })
    }

    /// Resolves the declared references of all staged aggregates against the
    /// post-commit state: staged inserts and updates count as present,
    /// staged deletes as gone, everything else is asked of the store.
    async fn resolve_references(&self) -> Result<ResolvedLookup> {
        let mut resolved: HashMap<(String, EntityId), bool> = HashMap::new();

        for op in &self.staged {
            let present = !matches!(op.op, ChangeOp::Delete);
            resolved.insert((op.aggregate_type.to_string(), op.record.id), present);
        }

        for op in &self.staged {
            for reference in &op.references {
                let key = (reference.aggregate_type.to_string(), reference.id);
                if !resolved.contains_key(&key) {
                    let exists = self
                        .store
                        .exists(reference.aggregate_type, reference.id)
                        .await?;
                    resolved.insert(key, exists);
                }
            }
        }

        Ok(ResolvedLookup { resolved })
    }

    fn run_validators(&self, lookup: &ResolvedLookup) -> Result<()> {
        for op in &self.staged {
            if matches!(op.op, ChangeOp::Delete) {
                continue;
            }
            let Some(validator) = self.registry.get(op.aggregate_type) else {
                continue;
            };
            let staged = StagedAggregate::new(op.aggregate_type, op.record.id, op.entity.as_ref());
            if let Err(err) = validator.validate(&staged, lookup) {
                metrics::counter!("unit_of_work_validation_failures").increment(1);
                return Err(PersistenceError::ValidationFailed {
                    aggregate_type: op.aggregate_type.to_string(),
                    aggregate_id: op.record.id,
                    reason: err.reason().to_string(),
                });
            }
        }
        Ok(())
    }
}

#[async_trait]
impl<S, A> Repository<A> for UnitOfWork<S>
where
    S: DataStore,
    A: AggregateRoot + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn get_single_by_id(&mut self, id: EntityId) -> Result<Option<A>> {
        self.ensure_open()?;

        let Some(record) = self.store.fetch(A::aggregate_type(), id).await? else {
            return Ok(None);
        };

        self.loaded.insert((A::aggregate_type(), id));
        Ok(Some(record.into_aggregate()?))
    }

    fn add(&mut self, aggregate: A) -> Result<()> {
        self.ensure_open()?;
        self.ensure_not_staged(A::aggregate_type(), aggregate.id())?;
        self.stage(ChangeOp::Insert, aggregate)
    }

    fn update(&mut self, aggregate: A) -> Result<()> {
        self.ensure_open()?;

        let key = (A::aggregate_type(), aggregate.id());
        if !self.loaded.contains(&key) {
            return Err(PersistenceError::InvalidOperation {
                reason: format!(
                    "{} {} was not loaded through this unit of work",
                    key.0, key.1
                ),
            });
        }
        self.ensure_not_staged(key.0, key.1)?;
        self.stage(ChangeOp::Update, aggregate)
    }

    fn remove(&mut self, aggregate: A) -> Result<()> {
        self.ensure_open()?;
        self.ensure_not_staged(A::aggregate_type(), aggregate.id())?;
        self.stage(ChangeOp::Delete, aggregate)
    }
}

struct ResolvedLookup {
    resolved: HashMap<(String, EntityId), bool>,
}

impl ValidationLookup for ResolvedLookup {
    fn will_exist(&self, aggregate_type: &str, id: EntityId) -> bool {
        self.resolved
            .get(&(aggregate_type.to_string(), id))
            .copied()
            .unwrap_or(false)
    }
}
