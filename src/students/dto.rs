use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;
use validator::Validate;

use crate::auth::identity::Role;
use crate::auth::repo_types::{Profile, User, UserSummary};
use crate::enrollments::repo_types::EnrollmentWithCourse;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 2, max = 100, message = "Name must be 2-100 characters"))]
    pub name: String,
    #[validate(length(max = 20, message = "Phone must be at most 20 characters"))]
    pub phone: Option<String>,
    #[validate(length(max = 500, message = "Address must be at most 500 characters"))]
    pub address: Option<String>,
    /// `YYYY-MM-DD`.
    pub date_of_birth: Option<String>,
    #[validate(length(max = 1000, message = "Bio must be at most 1000 characters"))]
    pub bio: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AccountView {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub profile: Option<Profile>,
}

impl AccountView {
    pub fn new(user: User, profile: Option<Profile>) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            created_at: user.created_at,
            profile,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StudentDetail {
    #[serde(flatten)]
    pub account: AccountView,
    pub enrollments: Vec<EnrollmentWithCourse>,
}

/// Every account with role tallies.
#[derive(Debug, Serialize)]
pub struct UserDirectory {
    pub total_users: usize,
    pub admin_count: usize,
    pub student_count: usize,
    pub users: Vec<UserSummary>,
}

impl UserDirectory {
    pub fn new(users: Vec<UserSummary>) -> Self {
        let admin_count = users.iter().filter(|u| u.role == Role::Admin).count();
        Self {
            total_users: users.len(),
            admin_count,
            student_count: users.len() - admin_count,
            users,
        }
    }
}

#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub struct ImportReport {
    pub success_count: usize,
    pub failed_count: usize,
    pub errors: Vec<String>,
}
