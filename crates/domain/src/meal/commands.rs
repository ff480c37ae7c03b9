use chrono::NaiveDate;
use common::EntityId;

/// One course in a create or update request.
#[derive(Debug, Clone)]
pub struct CourseInput {
    pub index: u32,
    pub main_course: bool,
    pub attendees: u32,
    pub dish_id: EntityId,
}

impl CourseInput {
    pub fn new(index: u32, main_course: bool, attendees: u32, dish_id: EntityId) -> Self {
        Self {
            index,
            main_course,
            attendees,
            dish_id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateMeal {
    pub dining_date: NaiveDate,
    pub courses: Vec<CourseInput>,
}

impl CreateMeal {
    pub fn new(dining_date: NaiveDate) -> Self {
        Self {
            dining_date,
            courses: Vec::new(),
        }
    }

    pub fn with_course(mut self, course: CourseInput) -> Self {
        self.courses.push(course);
        self
    }
}

/// Wholesale replacement of a meal's date and courses.
#[derive(Debug, Clone)]
pub struct UpdateMeal {
    pub meal_id: EntityId,
    pub etag: String,
    pub dining_date: NaiveDate,
    pub courses: Vec<CourseInput>,
}

#[derive(Debug, Clone)]
pub struct DeleteMeal {
    pub meal_id: EntityId,
    pub etag: String,
}

/// Removes the course at `index` and renumbers the rest contiguously.
#[derive(Debug, Clone)]
pub struct RemoveCourse {
    pub meal_id: EntityId,
    pub etag: String,
    pub index: u32,
}
