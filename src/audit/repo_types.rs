use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    DropStudent,
    AssignGrade,
    MarkAttendance,
    BulkImport,
    Upload,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditAction::Create => "CREATE",
            AuditAction::Update => "UPDATE",
            AuditAction::Delete => "DELETE",
            AuditAction::DropStudent => "DROP_STUDENT",
            AuditAction::AssignGrade => "ASSIGN_GRADE",
            AuditAction::MarkAttendance => "MARK_ATTENDANCE",
            AuditAction::BulkImport => "BULK_IMPORT",
            AuditAction::Upload => "UPLOAD",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditEntity {
    User,
    Student,
    Course,
    Enrollment,
    Attendance,
    Announcement,
    CourseMaterial,
}

impl AuditEntity {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditEntity::User => "USER",
            AuditEntity::Student => "STUDENT",
            AuditEntity::Course => "COURSE",
            AuditEntity::Enrollment => "ENROLLMENT",
            AuditEntity::Attendance => "ATTENDANCE",
            AuditEntity::Announcement => "ANNOUNCEMENT",
            AuditEntity::CourseMaterial => "COURSE_MATERIAL",
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub actor_id: Uuid,
    pub action: AuditAction,
    pub entity: AuditEntity,
    pub entity_id: Uuid,
    pub details: String,
}

/// Persisted audit row. Never updated or deleted.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub action: String,
    pub entity: String,
    pub entity_id: Uuid,
    pub details: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
