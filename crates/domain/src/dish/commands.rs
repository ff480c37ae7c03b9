//! Command payloads for dish operations.

use common::EntityId;

use super::UnitOfMeasurement;

/// Raw ingredient input carried by create/update commands; validated by the
/// aggregate when applied.
#[derive(Debug, Clone)]
pub struct IngredientInput {
    pub quantity: f64,
    pub unit: UnitOfMeasurement,
    pub description: String,
}

impl IngredientInput {
    /// Creates an ingredient input.
    pub fn new(quantity: f64, unit: UnitOfMeasurement, description: impl Into<String>) -> Self {
        Self {
            quantity,
            unit,
            description: description.into(),
        }
    }
}

/// Raw image input: content bytes plus MIME type.
#[derive(Debug, Clone)]
pub struct ImageInput {
    pub content: Vec<u8>,
    pub media_type: String,
}

/// Command to create a dish.
#[derive(Debug, Clone)]
pub struct CreateDish {
    pub name: String,
    pub description: Option<String>,
    pub servings: u32,
    pub instructions: Option<String>,
    pub ingredients: Vec<IngredientInput>,
    pub image: Option<ImageInput>,
}

impl CreateDish {
    /// Creates a minimal create command with no ingredients or image.
    pub fn new(name: impl Into<String>, servings: u32) -> Self {
        Self {
            name: name.into(),
            description: None,
            servings,
            instructions: None,
            ingredients: Vec::new(),
            image: None,
        }
    }

    /// Adds an ingredient, builder style.
    pub fn with_ingredient(
        mut self,
        quantity: f64,
        unit: UnitOfMeasurement,
        description: impl Into<String>,
    ) -> Self {
        self.ingredients
            .push(IngredientInput::new(quantity, unit, description));
        self
    }
}

/// Command to replace a dish wholesale, conditional on the client's ETag.
#[derive(Debug, Clone)]
pub struct UpdateDish {
    pub dish_id: EntityId,
    /// The version token the client last saw; the update succeeds only if
    /// it still matches the store.
    pub etag: String,
    pub name: String,
    pub description: Option<String>,
    pub servings: u32,
    pub instructions: Option<String>,
    pub ingredients: Vec<IngredientInput>,
    pub image: Option<ImageInput>,
}

/// Command to delete a dish, conditional on the client's ETag.
#[derive(Debug, Clone)]
pub struct DeleteDish {
    pub dish_id: EntityId,
    pub etag: String,
}
