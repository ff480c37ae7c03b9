//! Shared types used across the meal-planner workspace.

mod types;

pub use types::EntityId;
