use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::repo_types::AnnouncementPriority;

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateAnnouncementRequest {
    #[validate(length(min = 1, max = 200, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Content is required"))]
    pub content: String,
    #[serde(default)]
    pub priority: AnnouncementPriority,
    pub course_id: Option<Uuid>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

impl CreateAnnouncementRequest {
    pub fn normalized(mut self) -> Self {
        self.title = self.title.trim().to_string();
        self.content = self.content.trim().to_string();
        self
    }
}
