use common::EntityId;
use serde::{Deserialize, Serialize};

/// A single course within a meal.
///
/// Courses are identified by their one-based `index` within the meal, not
/// by an id of their own. The `dish_id` points at a dish aggregate that
/// must exist when the meal is committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub index: u32,
    pub main_course: bool,
    pub attendees: u32,
    pub dish_id: EntityId,
}

impl Course {
    pub fn new(index: u32, main_course: bool, attendees: u32, dish_id: EntityId) -> Self {
        Self {
            index,
            main_course,
            attendees,
            dish_id,
        }
    }
}
