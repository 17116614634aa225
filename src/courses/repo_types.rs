use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Course {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub credits: i32,
    pub capacity: i32,
    pub instructor: Option<String>,
    pub schedule: Option<String>,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Course plus its current number of `ACTIVE` enrollments.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CourseWithCount {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub course: Course,
    pub active_enrollments: i64,
}

#[derive(Debug, Clone)]
pub struct NewCourse {
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub credits: i32,
    pub capacity: i32,
    pub instructor: Option<String>,
    pub schedule: Option<String>,
    pub is_active: bool,
}

/// Partial update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct CourseChanges {
    pub code: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub credits: Option<i32>,
    pub capacity: Option<i32>,
    pub instructor: Option<String>,
    pub schedule: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug)]
pub enum CourseUpdate {
    Updated(Course),
    NotFound,
    CodeTaken,
}
