use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::Date;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "attendance_status", rename_all = "UPPERCASE")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AttendanceRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub date: Date,
    pub status: AttendanceStatus,
    pub marked_by: Uuid,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct AttendanceMark {
    pub user_id: Uuid,
    pub status: AttendanceStatus,
}

/// A student's attendance row joined with its course.
#[derive(Debug, Clone, FromRow)]
pub struct StudentAttendanceRow {
    pub course_id: Uuid,
    pub course_code: String,
    pub course_name: String,
    pub date: Date,
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, FromRow)]
pub struct AttendanceTally {
    pub present: i64,
    pub late: i64,
    pub absent: i64,
}

impl AttendanceTally {
    pub fn add(&mut self, status: AttendanceStatus) {
        match status {
            AttendanceStatus::Present => self.present += 1,
            AttendanceStatus::Late => self.late += 1,
            AttendanceStatus::Absent => self.absent += 1,
        }
    }

    pub fn total(&self) -> i64 {
        self.present + self.late + self.absent
    }
}
