use crate::state::AppState;
use axum::Router;

pub mod handlers;
pub mod recorder;
pub mod repo;
pub mod repo_types;

pub use recorder::AuditRecorder;
pub use repo_types::{AuditAction, AuditEntity};

pub fn router() -> Router<AppState> {
    handlers::audit_routes()
}
