use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Material metadata; the payload is only loaded for downloads.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Material {
    pub id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub file_name: String,
    pub file_type: String,
    pub file_size: i32,
    pub week: Option<i32>,
    pub module: Option<String>,
    pub uploaded_by: Uuid,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, FromRow)]
pub struct MaterialFile {
    pub course_id: Uuid,
    pub file_name: String,
    pub file_type: String,
    pub file_data: Vec<u8>,
    pub is_active: bool,
}

#[derive(Debug, Clone)]
pub struct NewMaterial {
    pub course_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub file_name: String,
    pub file_type: String,
    pub file_data: Vec<u8>,
    pub week: Option<i32>,
    pub module: Option<String>,
    pub uploaded_by: Uuid,
}
