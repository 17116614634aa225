use serde::{Deserialize, Serialize};
use validator::Validate;

use super::repo_types::Course;
use crate::enrollments::repo_types::{CourseEnrollee, EnrollmentStatus};

fn default_true() -> bool {
    true
}

pub(crate) fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCourseRequest {
    #[validate(length(min = 3, max = 20, message = "Course code must be 3-20 characters"))]
    pub code: String,
    #[validate(length(min = 3, max = 200, message = "Course name must be 3-200 characters"))]
    pub name: String,
    #[validate(length(max = 1000, message = "Description must be at most 1000 characters"))]
    pub description: Option<String>,
    #[validate(range(min = 1, max = 10, message = "Credits must be between 1 and 10"))]
    pub credits: i32,
    #[validate(range(min = 1, max = 500, message = "Capacity must be between 1 and 500"))]
    pub capacity: i32,
    #[validate(length(max = 100, message = "Instructor must be at most 100 characters"))]
    pub instructor: Option<String>,
    #[validate(length(max = 200, message = "Schedule must be at most 200 characters"))]
    pub schedule: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl CreateCourseRequest {
    pub fn normalized(self) -> Self {
        Self {
            code: self.code.trim().to_string(),
            name: self.name.trim().to_string(),
            description: trimmed(self.description),
            instructor: trimmed(self.instructor),
            schedule: trimmed(self.schedule),
            ..self
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateCourseRequest {
    #[validate(length(min = 3, max = 20, message = "Course code must be 3-20 characters"))]
    pub code: Option<String>,
    #[validate(length(min = 3, max = 200, message = "Course name must be 3-200 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 1000, message = "Description must be at most 1000 characters"))]
    pub description: Option<String>,
    #[validate(range(min = 1, max = 10, message = "Credits must be between 1 and 10"))]
    pub credits: Option<i32>,
    #[validate(range(min = 1, max = 500, message = "Capacity must be between 1 and 500"))]
    pub capacity: Option<i32>,
    #[validate(length(max = 100, message = "Instructor must be at most 100 characters"))]
    pub instructor: Option<String>,
    #[validate(length(max = 200, message = "Schedule must be at most 200 characters"))]
    pub schedule: Option<String>,
    pub is_active: Option<bool>,
}

impl UpdateCourseRequest {
    pub fn normalized(self) -> Self {
        Self {
            code: self.code.map(|c| c.trim().to_string()),
            name: self.name.map(|n| n.trim().to_string()),
            description: trimmed(self.description),
            instructor: trimmed(self.instructor),
            schedule: trimmed(self.schedule),
            ..self
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CourseDetail {
    #[serde(flatten)]
    pub course: Course,
    pub enrollments: Vec<CourseEnrollee>,
}

/// Course as seen by a student browsing the catalog.
#[derive(Debug, Serialize)]
pub struct CatalogEntry {
    #[serde(flatten)]
    pub course: Course,
    pub available_seats: i64,
    pub enrollment_status: Option<EnrollmentStatus>,
}
