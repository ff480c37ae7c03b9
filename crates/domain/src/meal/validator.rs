use persistence::{DeferredValidator, StagedAggregate, ValidationError, ValidationLookup};

use super::Meal;

/// Checks that every course of a staged meal points at a dish that will
/// exist once the batch commits.
#[derive(Debug, Default)]
pub struct CourseDishExists;

impl DeferredValidator for CourseDishExists {
    fn aggregate_type(&self) -> &'static str {
        "Meal"
    }

    fn validate(
        &self,
        staged: &StagedAggregate<'_>,
        lookup: &dyn ValidationLookup,
    ) -> Result<(), ValidationError> {
        let Some(meal) = staged.downcast_ref::<Meal>() else {
            return Err(ValidationError::new("staged aggregate is not a meal"));
        };

        for course in meal.courses() {
            if !lookup.will_exist("Dish", course.dish_id) {
                return Err(ValidationError::new(format!(
                    "course {} references unknown dish {}",
                    course.index, course.dish_id
                )));
            }
        }
        Ok(())
    }
}
