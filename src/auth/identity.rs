use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{PortalError, PortalResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "user_role", rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Student,
}

impl Role {
    /// Case-insensitive parse of `ADMIN` / `STUDENT`.
    pub fn parse(raw: &str) -> Option<Role> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Some(Role::Admin),
            "STUDENT" => Some(Role::Student),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Student => "STUDENT",
        }
    }
}

/// Caller identity established by the session layer.
///
/// Domain operations take this explicitly and trust it as given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub role: Role,
}

impl Identity {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn require(&self, role: Role) -> PortalResult<()> {
        if self.role == role {
            Ok(())
        } else {
            Err(PortalError::forbidden(match role {
                Role::Admin => "Administrator access required",
                Role::Student => "Student access required",
            }))
        }
    }

    pub fn require_admin(&self) -> PortalResult<()> {
        self.require(Role::Admin)
    }

    pub fn require_student(&self) -> PortalResult<()> {
        self.require(Role::Student)
    }
}
