//! Deferred cross-aggregate validation.
//!
//! Rules that span aggregate boundaries cannot run inside a single
//! aggregate's mutation methods; they run once per unit of work, after all
//! mutations are staged and before anything is written. Each aggregate type
//! has zero or one validator, registered explicitly in a
//! [`ValidatorRegistry`] and dispatched by type tag.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use common::EntityId;
use thiserror::Error;

/// A deferred rule failed for one staged aggregate.
#[derive(Debug, Error)]
#[error("{reason}")]
pub struct ValidationError {
    reason: String,
}

impl ValidationError {
    /// Creates a validation error with the given reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Returns the failure reason.
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Type-erased view of one aggregate staged for insert or update.
pub struct StagedAggregate<'a> {
    aggregate_type: &'a str,
    id: EntityId,
    entity: &'a (dyn Any + Send + Sync),
}

impl<'a> StagedAggregate<'a> {
    /// Creates a staged view over an aggregate held by the unit of work.
    pub fn new(aggregate_type: &'a str, id: EntityId, entity: &'a (dyn Any + Send + Sync)) -> Self {
        Self {
            aggregate_type,
            id,
            entity,
        }
    }

    /// Returns the type tag of the staged aggregate.
    pub fn aggregate_type(&self) -> &str {
        self.aggregate_type
    }

    /// Returns the identity of the staged aggregate.
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Recovers the concrete aggregate, if it is of type `A`.
    pub fn downcast_ref<A: 'static>(&self) -> Option<&A> {
        self.entity.downcast_ref()
    }
}

/// Pre-resolved existence lookup handed to validators.
///
/// `will_exist` answers for the state *after* the unit of work commits:
/// aggregates staged for insert or update count as present, aggregates
/// staged for delete count as gone, everything else falls back to the store.
/// The resolution happens before the validator pass so that validators stay
/// synchronous, pure computation.
pub trait ValidationLookup {
    /// Returns true if the referenced aggregate will exist after commit.
    fn will_exist(&self, aggregate_type: &str, id: EntityId) -> bool;
}

/// A cross-aggregate rule for one aggregate type.
pub trait DeferredValidator: Send + Sync {
    /// The aggregate type tag this validator applies to.
    fn aggregate_type(&self) -> &'static str;

    /// Validates one staged aggregate against the post-commit lookup.
    fn validate(
        &self,
        staged: &StagedAggregate<'_>,
        lookup: &dyn ValidationLookup,
    ) -> Result<(), ValidationError>;
}

/// Explicit mapping from aggregate type tag to validator.
///
/// Built by hand at startup; aggregate types without an entry are skipped
/// without error during the validation pass.
#[derive(Clone, Default)]
pub struct ValidatorRegistry {
    validators: HashMap<&'static str, Arc<dyn DeferredValidator>>,
}

impl ValidatorRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a validator, builder style.
    pub fn with(mut self, validator: Arc<dyn DeferredValidator>) -> Self {
        self.register(validator);
        self
    }

    /// Registers a validator under its aggregate type tag.
    ///
    /// At most one validator per type; a second registration replaces the
    /// first.
    pub fn register(&mut self, validator: Arc<dyn DeferredValidator>) {
        self.validators.insert(validator.aggregate_type(), validator);
    }

    /// Looks up the validator for an aggregate type, if any.
    pub fn get(&self, aggregate_type: &str) -> Option<&Arc<dyn DeferredValidator>> {
        self.validators.get(aggregate_type)
    }

    /// Returns the number of registered validators.
    pub fn len(&self) -> usize {
        self.validators.len()
    }

    /// Returns true if no validators are registered.
    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}
