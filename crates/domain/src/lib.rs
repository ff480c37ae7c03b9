//! Meal-planning domain: dish and meal aggregates with their application
//! services, layered on the optimistic-concurrency persistence crate.

pub mod dish;
pub mod error;
pub mod meal;
mod service;

pub use dish::{DishService, DishError};
pub use error::{DomainError, Result};
pub use meal::{MealError, MealService};
pub use service::Saved;

use std::sync::Arc;

use persistence::ValidatorRegistry;

use meal::CourseDishExists;

/// Registry with every deferred validator the domain defines.
///
/// Validators are wired explicitly; adding a new cross-aggregate rule
/// means registering it here.
pub fn default_registry() -> ValidatorRegistry {
    ValidatorRegistry::new().with(Arc::new(CourseDishExists))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_covers_meals() {
        let registry = default_registry();
        assert!(registry.get("Meal").is_some());
        assert!(registry.get("Dish").is_none());
    }
}
