//! Application service for dish operations.

use common::EntityId;
use persistence::{AggregateRoot, DataStore, Repository, UnitOfWork, ValidatorRegistry};

use crate::error::Result;
use crate::service::{Saved, adopt_etag, load_required, receipt_version};

use super::{CreateDish, DeleteDish, Dish, Ingredient, UpdateDish};

/// Service for managing dishes.
///
/// Each operation runs in its own unit of work: stage, validate, commit.
/// Updates and deletes are conditional on the ETag the client last saw.
pub struct DishService<S: DataStore + Clone> {
    store: S,
    registry: ValidatorRegistry,
}

impl<S: DataStore + Clone> DishService<S> {
    /// Creates a dish service with the default validator registry.
    pub fn new(store: S) -> Self {
        Self::with_registry(store, crate::default_registry())
    }

    /// Creates a dish service with an explicit validator registry.
    pub fn with_registry(store: S, registry: ValidatorRegistry) -> Self {
        Self { store, registry }
    }

    fn session(&self) -> UnitOfWork<S> {
        UnitOfWork::new(self.store.clone(), self.registry.clone())
    }

    /// Creates and persists a new dish.
    #[tracing::instrument(skip(self, cmd))]
    pub async fn create_dish(&self, cmd: CreateDish) -> Result<Saved<Dish>> {
        let mut dish = Dish::new(cmd.name, cmd.description, cmd.servings, cmd.instructions)?;
        for input in cmd.ingredients {
            dish.add_ingredient(input.quantity, input.unit, input.description)?;
        }
        if let Some(image) = cmd.image {
            dish.set_image(image.content, image.media_type);
        }

        let mut uow = self.session();
        uow.add(dish.clone())?;
        let receipt = uow.commit().await?;

        metrics::counter!("dishes_created").increment(1);
        let version = receipt_version(&receipt, dish.id())?;
        Ok(Saved {
            aggregate: dish,
            version,
        })
    }

    /// Loads a dish by id.
    ///
    /// Returns None if the dish doesn't exist.
    #[tracing::instrument(skip(self))]
    pub async fn get_dish(&self, dish_id: EntityId) -> Result<Option<Dish>> {
        let mut uow = self.session();
        Ok(Repository::<Dish>::get_single_by_id(&mut uow, dish_id).await?)
    }

    /// Replaces a dish wholesale, conditional on the client's ETag.
    #[tracing::instrument(skip(self, cmd), fields(dish_id = %cmd.dish_id))]
    pub async fn update_dish(&self, cmd: UpdateDish) -> Result<Saved<Dish>> {
        let mut uow = self.session();
        let mut dish: Dish = load_required(&mut uow, cmd.dish_id).await?;
        adopt_etag(&mut dish, &cmd.etag)?;

        dish.rename(cmd.name)?;
        dish.set_servings(cmd.servings)?;
        dish.set_description(cmd.description);
        dish.set_instructions(cmd.instructions);

        let mut ingredients = Vec::with_capacity(cmd.ingredients.len());
        for input in cmd.ingredients {
            ingredients.push(Ingredient::new(input.quantity, input.unit, input.description)?);
        }
        dish.replace_ingredients_with(ingredients);

        match cmd.image {
            Some(image) => dish.set_image(image.content, image.media_type),
            None => dish.remove_image(),
        }

        uow.update(dish.clone())?;
        let receipt = uow.commit().await?;

        let version = receipt_version(&receipt, dish.id())?;
        Ok(Saved {
            aggregate: dish,
            version,
        })
    }

    /// Deletes a dish, conditional on the client's ETag.
    #[tracing::instrument(skip(self, cmd), fields(dish_id = %cmd.dish_id))]
    pub async fn delete_dish(&self, cmd: DeleteDish) -> Result<()> {
        let mut uow = self.session();
        let mut dish: Dish = load_required(&mut uow, cmd.dish_id).await?;
        adopt_etag(&mut dish, &cmd.etag)?;

        uow.remove(dish)?;
        uow.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dish::UnitOfMeasurement;
    use crate::error::DomainError;
    use persistence::{InMemoryDataStore, PersistenceError};

    fn service() -> DishService<InMemoryDataStore> {
        DishService::new(InMemoryDataStore::new())
    }

    #[tokio::test]
    async fn create_and_get_dish() {
        let service = service();

        let saved = service
            .create_dish(
                CreateDish::new("Pancakes", 2)
                    .with_ingredient(200.0, UnitOfMeasurement::Gram, "flour"),
            )
            .await
            .unwrap();
        assert!(!saved.etag().is_empty());

        let loaded = service.get_dish(saved.aggregate.id()).await.unwrap().unwrap();
        assert_eq!(loaded.name(), "Pancakes");
        assert_eq!(loaded.ingredients().len(), 1);
    }

    #[tokio::test]
    async fn create_dish_with_invalid_ingredient_fails() {
        let service = service();

        let result = service
            .create_dish(
                CreateDish::new("Soup", 4).with_ingredient(0.0, UnitOfMeasurement::Liter, "water"),
            )
            .await;

        assert!(matches!(result, Err(DomainError::Dish(_))));
    }

    #[tokio::test]
    async fn update_with_current_etag_succeeds() {
        let service = service();
        let saved = service.create_dish(CreateDish::new("Salad", 2)).await.unwrap();

        let updated = service
            .update_dish(UpdateDish {
                dish_id: saved.aggregate.id(),
                etag: saved.etag(),
                name: "Greek Salad".to_string(),
                description: None,
                servings: 3,
                instructions: None,
                ingredients: vec![],
                image: None,
            })
            .await
            .unwrap();

        assert_eq!(updated.aggregate.name(), "Greek Salad");
        assert_ne!(updated.etag(), saved.etag());
    }

    #[tokio::test]
    async fn update_with_stale_etag_is_a_concurrent_update() {
        let service = service();
        let saved = service.create_dish(CreateDish::new("Stew", 4)).await.unwrap();
        let dish_id = saved.aggregate.id();
        let stale_etag = saved.etag();

        // First writer wins.
        service
            .update_dish(UpdateDish {
                dish_id,
                etag: stale_etag.clone(),
                name: "Beef Stew".to_string(),
                description: None,
                servings: 4,
                instructions: None,
                ingredients: vec![],
                image: None,
            })
            .await
            .unwrap();

        // Second writer resubmits the old token.
        let result = service
            .update_dish(UpdateDish {
                dish_id,
                etag: stale_etag,
                name: "Lamb Stew".to_string(),
                description: None,
                servings: 4,
                instructions: None,
                ingredients: vec![],
                image: None,
            })
            .await;

        assert!(matches!(
            result,
            Err(DomainError::Persistence(
                PersistenceError::ConcurrentUpdate { .. }
            ))
        ));

        let stored = service.get_dish(dish_id).await.unwrap().unwrap();
        assert_eq!(stored.name(), "Beef Stew");
    }

    #[tokio::test]
    async fn update_with_garbage_etag_is_a_format_error() {
        let service = service();
        let saved = service.create_dish(CreateDish::new("Pie", 6)).await.unwrap();

        let result = service
            .update_dish(UpdateDish {
                dish_id: saved.aggregate.id(),
                etag: "!!! not base64 !!!".to_string(),
                name: "Pie".to_string(),
                description: None,
                servings: 6,
                instructions: None,
                ingredients: vec![],
                image: None,
            })
            .await;

        assert!(matches!(result, Err(DomainError::InvalidVersionToken(_))));
    }

    #[tokio::test]
    async fn delete_then_get_returns_none() {
        let service = service();
        let saved = service.create_dish(CreateDish::new("Toast", 1)).await.unwrap();
        let dish_id = saved.aggregate.id();

        service
            .delete_dish(DeleteDish {
                dish_id,
                etag: saved.etag(),
            })
            .await
            .unwrap();

        assert!(service.get_dish(dish_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_missing_dish_is_not_found() {
        let service = service();

        let result = service
            .update_dish(UpdateDish {
                dish_id: EntityId::new(),
                etag: String::new(),
                name: "Ghost".to_string(),
                description: None,
                servings: 1,
                instructions: None,
                ingredients: vec![],
                image: None,
            })
            .await;

        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }
}
