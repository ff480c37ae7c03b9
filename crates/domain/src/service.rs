//! Shared plumbing for the application services.

use common::EntityId;
use persistence::{
    AggregateRoot, CommitReceipt, DataStore, EntityVersion, PersistenceError, Repository,
    UnitOfWork,
};
use serde::{Serialize, de::DeserializeOwned};

use crate::error::{DomainError, Result};

/// A persisted aggregate together with the version token assigned by the
/// commit, the value handed back to the client as its next ETag.
#[derive(Debug)]
pub struct Saved<A> {
    pub aggregate: A,
    pub version: EntityVersion,
}

impl<A> Saved<A> {
    /// Returns the wire form of the new version token.
    pub fn etag(&self) -> String {
        self.version.as_str()
    }
}

/// Loads an aggregate or fails with `NotFound`.
pub(crate) async fn load_required<S, A>(uow: &mut UnitOfWork<S>, id: EntityId) -> Result<A>
where
    S: DataStore,
    A: AggregateRoot + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    Repository::<A>::get_single_by_id(uow, id)
        .await?
        .ok_or(DomainError::NotFound {
            aggregate_type: A::aggregate_type(),
            id,
        })
}

/// Adopts a client-supplied ETag onto a loaded aggregate.
///
/// Replacing the freshly loaded version with the client's claimed one is
/// what lets the store detect a stale write at commit time.
pub(crate) fn adopt_etag<A: AggregateRoot>(aggregate: &mut A, etag: &str) -> Result<()> {
    let mut version = aggregate.version().clone();
    version.set_base64(etag)?;
    aggregate.set_version(version);
    Ok(())
}

/// Pulls the version assigned to `id` out of a commit receipt.
///
/// Every staged insert and update appears in the receipt, so a miss here
/// means the aggregate was never staged.
pub(crate) fn receipt_version(receipt: &CommitReceipt, id: EntityId) -> Result<EntityVersion> {
    receipt
        .version_of(id)
        .cloned()
        .ok_or_else(|| {
            DomainError::Persistence(PersistenceError::InvalidOperation {
                reason: format!("commit receipt has no version for aggregate {id}"),
            })
        })
}
