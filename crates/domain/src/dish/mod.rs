//! Dish aggregate and related types.

mod aggregate;
mod commands;
mod service;
mod value_objects;

pub use aggregate::Dish;
pub use commands::{CreateDish, DeleteDish, ImageInput, IngredientInput, UpdateDish};
pub use service::DishService;
pub use value_objects::{DishImage, Ingredient, UnitOfMeasurement};

use thiserror::Error;

/// Invariant violations raised synchronously by dish mutation methods.
#[derive(Debug, Error)]
pub enum DishError {
    /// The dish name must not be empty.
    #[error("Dish name must not be empty")]
    EmptyName,

    /// The number of servings must be positive.
    #[error("Servings must be greater than 0")]
    NonPositiveServings,

    /// Ingredient quantities must be positive.
    #[error("Invalid ingredient quantity: {quantity} (must be greater than 0)")]
    NonPositiveQuantity { quantity: f64 },
}
