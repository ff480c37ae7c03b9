//! Value objects owned by the dish aggregate.

use serde::{Deserialize, Serialize};

use super::DishError;

/// Fixed set of measurement units an ingredient can be expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitOfMeasurement {
    Piece,
    Gram,
    Kilogram,
    Milliliter,
    Liter,
    Teaspoon,
    Tablespoon,
    Cup,
    Pinch,
}

impl std::fmt::Display for UnitOfMeasurement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            UnitOfMeasurement::Piece => "piece",
            UnitOfMeasurement::Gram => "g",
            UnitOfMeasurement::Kilogram => "kg",
            UnitOfMeasurement::Milliliter => "ml",
            UnitOfMeasurement::Liter => "l",
            UnitOfMeasurement::Teaspoon => "tsp",
            UnitOfMeasurement::Tablespoon => "tbsp",
            UnitOfMeasurement::Cup => "cup",
            UnitOfMeasurement::Pinch => "pinch",
        };
        write!(f, "{name}")
    }
}

/// An ingredient of a dish.
///
/// Value object with no independent lifecycle: created and destroyed only
/// through the owning [`Dish`](super::Dish). Compared by value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    quantity: f64,
    unit: UnitOfMeasurement,
    description: String,
}

impl Ingredient {
    /// Creates an ingredient, rejecting non-positive quantities.
    pub fn new(
        quantity: f64,
        unit: UnitOfMeasurement,
        description: impl Into<String>,
    ) -> Result<Self, DishError> {
        if !(quantity > 0.0) {
            return Err(DishError::NonPositiveQuantity { quantity });
        }
        Ok(Self {
            quantity,
            unit,
            description: description.into(),
        })
    }

    /// Returns the quantity, always positive.
    pub fn quantity(&self) -> f64 {
        self.quantity
    }

    /// Returns the unit of measurement.
    pub fn unit(&self) -> UnitOfMeasurement {
        self.unit
    }

    /// Returns the free-text description.
    pub fn description(&self) -> &str {
        &self.description
    }
}

/// Image attached to a dish: content and media type are present together or
/// not at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DishImage {
    content: Vec<u8>,
    media_type: String,
}

impl DishImage {
    /// Creates an image from raw content and its MIME type.
    pub fn new(content: Vec<u8>, media_type: impl Into<String>) -> Self {
        Self {
            content,
            media_type: media_type.into(),
        }
    }

    /// Returns the raw image bytes.
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Returns the MIME content type.
    pub fn media_type(&self) -> &str {
        &self.media_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ingredient_rejects_zero_quantity() {
        let result = Ingredient::new(0.0, UnitOfMeasurement::Gram, "flour");
        assert!(matches!(
            result,
            Err(DishError::NonPositiveQuantity { .. })
        ));
    }

    #[test]
    fn ingredient_rejects_negative_quantity() {
        let result = Ingredient::new(-1.5, UnitOfMeasurement::Liter, "milk");
        assert!(matches!(
            result,
            Err(DishError::NonPositiveQuantity { .. })
        ));
    }

    #[test]
    fn ingredient_rejects_nan_quantity() {
        let result = Ingredient::new(f64::NAN, UnitOfMeasurement::Cup, "sugar");
        assert!(result.is_err());
    }

    #[test]
    fn ingredient_value_equality() {
        let a = Ingredient::new(2.0, UnitOfMeasurement::Piece, "eggs").unwrap();
        let b = Ingredient::new(2.0, UnitOfMeasurement::Piece, "eggs").unwrap();
        let c = Ingredient::new(3.0, UnitOfMeasurement::Piece, "eggs").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn unit_display() {
        assert_eq!(UnitOfMeasurement::Tablespoon.to_string(), "tbsp");
        assert_eq!(UnitOfMeasurement::Piece.to_string(), "piece");
    }

    #[test]
    fn ingredient_serialization_roundtrip() {
        let ingredient = Ingredient::new(0.5, UnitOfMeasurement::Teaspoon, "salt").unwrap();
        let json = serde_json::to_string(&ingredient).unwrap();
        let restored: Ingredient = serde_json::from_str(&json).unwrap();
        assert_eq!(ingredient, restored);
    }
}
