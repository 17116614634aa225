use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize)]
pub struct EnrollRequest {
    pub course_id: Uuid,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AssignGradeRequest {
    #[validate(length(min = 1, max = 10, message = "Grade must be 1-10 characters"))]
    pub grade: String,
}

impl AssignGradeRequest {
    pub fn normalized(self) -> Self {
        Self {
            grade: self.grade.trim().to_string(),
        }
    }
}
