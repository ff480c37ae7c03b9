//! Meal aggregate: a dining date plus an ordered list of courses.

mod aggregate;
mod commands;
mod service;
mod validator;
mod value_objects;

pub use aggregate::Meal;
pub use commands::{CourseInput, CreateMeal, DeleteMeal, RemoveCourse, UpdateMeal};
pub use service::MealService;
pub use validator::CourseDishExists;
pub use value_objects::Course;

/// Invariant violations raised by meal mutations.
#[derive(Debug, thiserror::Error)]
pub enum MealError {
    /// Course indices start at one.
    #[error("course index must be greater than zero")]
    NonPositiveIndex,
    /// Every course needs at least one attendee.
    #[error("course attendees must be greater than zero")]
    NonPositiveAttendees,
    /// A meal has at most one main course.
    #[error("meal already has a main course")]
    SecondMainCourse,
    /// Shifting the occupied run would push a course past the largest
    /// representable index.
    #[error("no room to shift courses above the requested index")]
    IndexOverflow,
}
