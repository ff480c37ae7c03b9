use chrono::NaiveDate;
use common::EntityId;
use persistence::{AggregateRef, AggregateRoot, EntityVersion};
use serde::{Deserialize, Serialize};

use super::{Course, MealError};

/// A planned meal on a given date.
///
/// Courses carry one-based indices and stay sorted by index. At most one
/// course may be the main course. Inserting at an occupied index pushes
/// the contiguous run of occupied indices up by one, leaving gaps beyond
/// the run untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meal {
    id: EntityId,
    dining_date: NaiveDate,
    courses: Vec<Course>,
    #[serde(skip)]
    version: EntityVersion,
}

impl AggregateRoot for Meal {
    fn aggregate_type() -> &'static str {
        "Meal"
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

    fn references(&self) -> Vec<AggregateRef> {
        let mut refs: Vec<AggregateRef> = self
            .courses
            .iter()
            .map(|course| AggregateRef::new("Dish", course.dish_id))
            .collect();
        refs.sort_by_key(|r| r.id.as_uuid());
        refs.dedup_by_key(|r| r.id.as_uuid());
        refs
    }
}

impl Meal {
    pub fn new(dining_date: NaiveDate) -> Self {
        Self {
            id: EntityId::new(),
            dining_date,
            courses: Vec::new(),
            version: EntityVersion::default(),
        }
    }

    pub fn dining_date(&self) -> NaiveDate {
        self.dining_date
    }

    /// Courses in ascending index order.
    pub fn courses(&self) -> &[Course] {
        &self.courses
    }

    pub fn course_at(&self, index: u32) -> Option<&Course> {
        self.courses.iter().find(|course| course.index == index)
    }

    pub fn main_course(&self) -> Option<&Course> {
        self.courses.iter().find(|course| course.main_course)
    }

    pub fn has_main_course(&self) -> bool {
        self.main_course().is_some()
    }

    pub fn set_dining_date(&mut self, dining_date: NaiveDate) {
        self.dining_date = dining_date;
    }

    /// Adds a course at `index`.
    ///
    /// If `index` is already taken, the occupied run starting there shifts
    /// up by one to make room. Courses past the first gap keep their
    /// indices.
    pub fn add_course(
        &mut self,
        index: u32,
        main_course: bool,
        attendees: u32,
        dish_id: EntityId,
    ) -> Result<(), MealError> {
        if index == 0 {
            return Err(MealError::NonPositiveIndex);
        }
        if attendees == 0 {
            return Err(MealError::NonPositiveAttendees);
        }
        if main_course && self.has_main_course() {
            return Err(MealError::SecondMainCourse);
        }

        if self.course_at(index).is_some() {
            let mut end = index;
            while self.course_at(end).is_some() {
                end = end.checked_add(1).ok_or(MealError::IndexOverflow)?;
            }
            for course in &mut self.courses {
                if course.index >= index && course.index < end {
                    course.index += 1;
                }
            }
        }

        self.courses.push(Course::new(index, main_course, attendees, dish_id));
        self.courses.sort_by_key(|course| course.index);
        Ok(())
    }

    pub fn remove_all_courses(&mut self) {
        self.courses.clear();
    }
}
