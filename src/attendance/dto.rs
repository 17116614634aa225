use serde::{Deserialize, Serialize};
use time::Date;
use uuid::Uuid;

use super::repo_types::{AttendanceMark, AttendanceStatus};

#[derive(Debug, Clone, Deserialize)]
pub struct MarkAttendanceRequest {
    pub course_id: Uuid,
    /// `YYYY-MM-DD` or an RFC 3339 timestamp.
    pub date: String,
    pub records: Vec<AttendanceMark>,
}

#[derive(Debug, Serialize)]
pub struct MarkAttendanceResponse {
    pub course_id: Uuid,
    pub date: Date,
    pub marked: usize,
}

#[derive(Debug, Deserialize)]
pub struct CourseDayQuery {
    pub course_id: Uuid,
    pub date: String,
}

#[derive(Debug, Deserialize)]
pub struct PercentageQuery {
    pub student_id: Uuid,
    pub course_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct PercentageResponse {
    pub student_id: Uuid,
    pub course_id: Uuid,
    pub percentage: u8,
    pub at_risk: bool,
}

#[derive(Debug, Serialize)]
pub struct DayRecord {
    pub date: Date,
    pub status: AttendanceStatus,
}

#[derive(Debug, Serialize)]
pub struct CourseAttendanceSummary {
    pub course_id: Uuid,
    pub course_code: String,
    pub course_name: String,
    pub percentage: u8,
    pub at_risk: bool,
    pub records: Vec<DayRecord>,
}
