//! Application service for meal operations.

use common::EntityId;
use persistence::{AggregateRoot, DataStore, Repository, UnitOfWork, ValidatorRegistry};

use crate::error::{DomainError, Result};
use crate::service::{Saved, adopt_etag, load_required, receipt_version};

use super::{CreateMeal, DeleteMeal, Meal, RemoveCourse, UpdateMeal};

/// Service for managing meals.
///
/// Cross-aggregate rules (every course must point at an existing dish) are
/// deferred to commit time via the validator registry, so a meal and the
/// dishes it references can be staged in any order.
pub struct MealService<S: DataStore + Clone> {
    store: S,
    registry: ValidatorRegistry,
}

impl<S: DataStore + Clone> MealService<S> {
    /// Creates a meal service with the default validator registry.
    pub fn new(store: S) -> Self {
        Self::with_registry(store, crate::default_registry())
    }

    /// Creates a meal service with an explicit validator registry.
    pub fn with_registry(store: S, registry: ValidatorRegistry) -> Self {
        Self { store, registry }
    }

    fn session(&self) -> UnitOfWork<S> {
        UnitOfWork::new(self.store.clone(), self.registry.clone())
    }

    /// Creates and persists a new meal.
    #[tracing::instrument(skip(self, cmd))]
    pub async fn create_meal(&self, cmd: CreateMeal) -> Result<Saved<Meal>> {
        let mut meal = Meal::new(cmd.dining_date);
        for course in cmd.courses {
            meal.add_course(course.index, course.main_course, course.attendees, course.dish_id)?;
        }

        let mut uow = self.session();
        uow.add(meal.clone())?;
        let receipt = uow.commit().await?;

        metrics::counter!("meals_created").increment(1);
        let version = receipt_version(&receipt, meal.id())?;
        Ok(Saved {
            aggregate: meal,
            version,
        })
    }

    /// Loads a meal by id.
    ///
    /// Returns None if the meal doesn't exist.
    #[tracing::instrument(skip(self))]
    pub async fn get_meal(&self, meal_id: EntityId) -> Result<Option<Meal>> {
        let mut uow = self.session();
        Ok(Repository::<Meal>::get_single_by_id(&mut uow, meal_id).await?)
    }

    /// Replaces a meal's date and courses, conditional on the client's ETag.
    #[tracing::instrument(skip(self, cmd), fields(meal_id = %cmd.meal_id))]
    pub async fn update_meal(&self, cmd: UpdateMeal) -> Result<Saved<Meal>> {
        let mut uow = self.session();
        let mut meal: Meal = load_required(&mut uow, cmd.meal_id).await?;
        adopt_etag(&mut meal, &cmd.etag)?;

        meal.set_dining_date(cmd.dining_date);
        meal.remove_all_courses();
        for course in cmd.courses {
            meal.add_course(course.index, course.main_course, course.attendees, course.dish_id)?;
        }

        uow.update(meal.clone())?;
        let receipt = uow.commit().await?;

        let version = receipt_version(&receipt, meal.id())?;
        Ok(Saved {
            aggregate: meal,
            version,
        })
    }

    /// Deletes a meal, conditional on the client's ETag.
    #[tracing::instrument(skip(self, cmd), fields(meal_id = %cmd.meal_id))]
    pub async fn delete_meal(&self, cmd: DeleteMeal) -> Result<()> {
        let mut uow = self.session();
        let mut meal: Meal = load_required(&mut uow, cmd.meal_id).await?;
        adopt_etag(&mut meal, &cmd.etag)?;

        uow.remove(meal)?;
        uow.commit().await?;
        Ok(())
    }

    /// Removes one course and renumbers the survivors contiguously from one.
    ///
    /// If exactly one course survives it becomes the main course.
    #[tracing::instrument(skip(self, cmd), fields(meal_id = %cmd.meal_id, index = cmd.index))]
    pub async fn remove_course(&self, cmd: RemoveCourse) -> Result<Saved<Meal>> {
        let mut uow = self.session();
        let mut meal: Meal = load_required(&mut uow, cmd.meal_id).await?;
        adopt_etag(&mut meal, &cmd.etag)?;

        if meal.course_at(cmd.index).is_none() {
            return Err(DomainError::CourseNotFound {
                meal_id: cmd.meal_id,
                index: cmd.index,
            });
        }

        let survivors: Vec<_> = meal
            .courses()
            .iter()
            .filter(|course| course.index != cmd.index)
            .cloned()
            .collect();
        let promote = survivors.len() == 1;

        meal.remove_all_courses();
        for (position, course) in survivors.into_iter().enumerate() {
            meal.add_course(
                position as u32 + 1,
                promote || course.main_course,
                course.attendees,
                course.dish_id,
            )?;
        }

        uow.update(meal.clone())?;
        let receipt = uow.commit().await?;

        let version = receipt_version(&receipt, meal.id())?;
        Ok(Saved {
            aggregate: meal,
            version,
        })
    }
}
