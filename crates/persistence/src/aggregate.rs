//! The aggregate-root capability consumed by repositories and the unit of work.

use common::EntityId;

use crate::EntityVersion;

/// A typed reference from one aggregate to another.
///
/// Declared references feed the deferred-validation lookup and the physical
/// store's referential check at commit time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AggregateRef {
    /// Type tag of the referenced aggregate (e.g. `"Dish"`).
    pub aggregate_type: &'static str,

    /// Identity of the referenced aggregate.
    pub id: EntityId,
}

impl AggregateRef {
    /// Creates a reference to an aggregate of the given type.
    pub fn new(aggregate_type: &'static str, id: EntityId) -> Self {
        Self { aggregate_type, id }
    }
}

impl std::fmt::Display for AggregateRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.aggregate_type, self.id)
    }
}

/// Trait for aggregate roots persisted through the unit of work.
///
/// Every root has an identity assigned at construction and an opaque
/// [`EntityVersion`] the store compares on update. Aggregates are mutated
/// only through their own methods; the persistence layer sees them as whole
/// documents that are replaced wholesale, children included.
pub trait AggregateRoot: Send + Sync {
    /// Returns the aggregate type tag.
    ///
    /// Used as the store partition key and for validator dispatch.
    fn aggregate_type() -> &'static str
    where
        Self: Sized;

    /// Returns the aggregate's identity.
    fn id(&self) -> EntityId;

    /// Returns the current concurrency token.
    fn version(&self) -> &EntityVersion;

    /// Replaces the concurrency token.
    ///
    /// Called by the repository after loading and by callers adopting a
    /// client-supplied ETag before an update.
    fn set_version(&mut self, version: EntityVersion);

    /// Returns the cross-aggregate references this root holds.
    ///
    /// The default is no references.
    fn references(&self) -> Vec<AggregateRef> {
        Vec::new()
    }
}
