use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "announcement_priority", rename_all = "UPPERCASE")]
pub enum AnnouncementPriority {
    #[default]
    Normal,
    High,
    Urgent,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Announcement {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub priority: AnnouncementPriority,
    /// `None` means the announcement is global.
    pub course_id: Option<Uuid>,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AnnouncementWithCourse {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub announcement: Announcement,
    pub course_code: Option<String>,
    pub course_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewAnnouncement {
    pub title: String,
    pub content: String,
    pub priority: AnnouncementPriority,
    pub course_id: Option<Uuid>,
    pub is_active: bool,
}
