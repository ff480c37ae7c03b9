//! Domain error types.

use common::EntityId;
use persistence::{PersistenceError, VersionFormatError};
use thiserror::Error;

use crate::{dish::DishError, meal::MealError};

/// Errors surfaced by the application services.
///
/// Failure conditions stay distinct all the way out: a caller retries a
/// `ConcurrentUpdate` (inside [`PersistenceError`]), rejects a validation
/// failure, and files a bug for an `InvalidOperation`.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Lookup by id returned nothing.
    #[error("{aggregate_type} not found: {id}")]
    NotFound {
        aggregate_type: &'static str,
        id: EntityId,
    },

    /// The meal exists but has no course at the given index.
    #[error("Meal {meal_id} has no course at index {index}")]
    CourseNotFound { meal_id: EntityId, index: u32 },

    /// A dish invariant was violated before any staging occurred.
    #[error(transparent)]
    Dish(#[from] DishError),

    /// A meal invariant was violated before any staging occurred.
    #[error(transparent)]
    Meal(#[from] MealError),

    /// The client-supplied ETag was not a valid version token.
    #[error(transparent)]
    InvalidVersionToken(#[from] VersionFormatError),

    /// An error from the unit of work: invalid operation, deferred
    /// validation failure, concurrent update, or a store fault.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Result type for domain service operations.
pub type Result<T> = std::result::Result<T, DomainError>;
