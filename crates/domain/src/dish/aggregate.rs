//! Dish aggregate implementation.

use common::EntityId;
use persistence::{AggregateRoot, EntityVersion};
use serde::{Deserialize, Serialize};

use super::{DishError, DishImage, Ingredient, UnitOfMeasurement};

/// Dish aggregate root.
///
/// Owns its ingredients and optional image; both are mutated only through
/// the methods here and replaced wholesale on update. The concurrency token
/// is not part of the stored document, it travels on the row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dish {
    id: EntityId,
    name: String,
    description: Option<String>,
    servings: u32,
    instructions: Option<String>,
    image: Option<DishImage>,
    ingredients: Vec<Ingredient>,
    #[serde(skip)]
    version: EntityVersion,
}

impl AggregateRoot for Dish {
    fn aggregate_type() -> &'static str {
        "Dish"
    }

    fn id(&self) -> EntityId {
        self.id
    }

    fn version(&self) -> &EntityVersion {
        &self.version
    }

    fn set_version(&mut self, version: EntityVersion) {
        self.version = version;
    }
}

impl Dish {
    /// Creates a dish, enforcing the field invariants.
    pub fn new(
        name: impl Into<String>,
        description: Option<String>,
        servings: u32,
        instructions: Option<String>,
    ) -> Result<Self, DishError> {
        let name = name.into();
        Self::check_name(&name)?;
        Self::check_servings(servings)?;

        Ok(Self {
            id: EntityId::new(),
            name,
            description,
            servings,
            instructions,
            image: None,
            ingredients: Vec::new(),
            version: EntityVersion::default(),
        })
    }

    fn check_name(name: &str) -> Result<(), DishError> {
        if name.trim().is_empty() {
            return Err(DishError::EmptyName);
        }
        Ok(())
    }

    fn check_servings(servings: u32) -> Result<(), DishError> {
        if servings == 0 {
            return Err(DishError::NonPositiveServings);
        }
        Ok(())
    }
}

// Query methods
impl Dish {
    /// Returns the dish name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the optional description.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the number of servings.
    pub fn servings(&self) -> u32 {
        self.servings
    }

    /// Returns the optional preparation instructions.
    pub fn instructions(&self) -> Option<&str> {
        self.instructions.as_deref()
    }

    /// Returns the attached image, if any.
    pub fn image(&self) -> Option<&DishImage> {
        self.image.as_ref()
    }

    /// Returns a stable read-only view of the ingredients.
    pub fn ingredients(&self) -> &[Ingredient] {
        &self.ingredients
    }
}

// Mutation methods
impl Dish {
    /// Renames the dish.
    pub fn rename(&mut self, name: impl Into<String>) -> Result<(), DishError> {
        let name = name.into();
        Self::check_name(&name)?;
        self.name = name;
        Ok(())
    }

    /// Changes the number of servings.
    pub fn set_servings(&mut self, servings: u32) -> Result<(), DishError> {
        Self::check_servings(servings)?;
        self.servings = servings;
        Ok(())
    }

    /// Replaces the description.
    pub fn set_description(&mut self, description: Option<String>) {
        self.description = description;
    }

    /// Replaces the preparation instructions.
    pub fn set_instructions(&mut self, instructions: Option<String>) {
        self.instructions = instructions;
    }

    /// Appends an ingredient.
    ///
    /// Fails without mutating state if the quantity is not positive.
    pub fn add_ingredient(
        &mut self,
        quantity: f64,
        unit: UnitOfMeasurement,
        description: impl Into<String>,
    ) -> Result<(), DishError> {
        let ingredient = Ingredient::new(quantity, unit, description)?;
        self.ingredients.push(ingredient);
        Ok(())
    }

    /// Replaces the whole ingredient list.
    ///
    /// Update flows always resend the full list; there is no in-place patch.
    pub fn replace_ingredients_with(&mut self, ingredients: Vec<Ingredient>) {
        self.ingredients = ingredients;
    }

    /// Removes the first ingredient equal to the given one.
    ///
    /// Returns true if an ingredient was removed.
    pub fn remove_ingredient(&mut self, ingredient: &Ingredient) -> bool {
        match self.ingredients.iter().position(|i| i == ingredient) {
            Some(pos) => {
                self.ingredients.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Clears the ingredient list.
    pub fn remove_all_ingredients(&mut self) {
        self.ingredients.clear();
    }

    /// Attaches an image; content and media type always travel together.
    pub fn set_image(&mut self, content: Vec<u8>, media_type: impl Into<String>) {
        self.image = Some(DishImage::new(content, media_type));
    }

    /// Removes the image.
    pub fn remove_image(&mut self) {
        self.image = None;
    }
}
