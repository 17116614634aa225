use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "enrollment_status", rename_all = "UPPERCASE")]
pub enum EnrollmentStatus {
    Active,
    Dropped,
    Completed,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Enrollment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub status: EnrollmentStatus,
    pub grade: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub enrolled_at: OffsetDateTime,
}

/// Course columns carried alongside an enrollment.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CourseBrief {
    #[sqlx(rename = "course_code")]
    pub code: String,
    #[sqlx(rename = "course_name")]
    pub name: String,
    #[sqlx(rename = "course_credits")]
    pub credits: i32,
    #[sqlx(rename = "course_instructor")]
    pub instructor: Option<String>,
    #[sqlx(rename = "course_schedule")]
    pub schedule: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct EnrollmentWithCourse {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub enrollment: Enrollment,
    #[sqlx(flatten)]
    pub course: CourseBrief,
}

/// Enrollment with the display names used in audit details.
#[derive(Debug, Clone, FromRow)]
pub struct EnrollmentParties {
    #[sqlx(flatten)]
    pub enrollment: Enrollment,
    pub student_name: String,
    pub course_name: String,
}

/// One row of a course roster.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CourseEnrollee {
    pub enrollment_id: Uuid,
    pub user_id: Uuid,
    pub student_name: String,
    pub student_email: String,
    pub status: EnrollmentStatus,
    pub grade: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub enrolled_at: OffsetDateTime,
}

#[derive(Debug)]
pub enum EnrollInsert {
    Created(Enrollment),
    CourseMissing,
    Full,
    Duplicate,
}
