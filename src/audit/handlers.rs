use axum::{extract::State, routing::get, Router};
use serde::Deserialize;
use tracing::instrument;

use super::repo_types::AuditLogEntry;
use crate::{
    auth::jwt::AuthUser,
    error::PortalResult,
    extract::{Json, Query},
    state::AppState,
};

const MAX_LIMIT: i64 = 500;

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    100
}

pub fn audit_routes() -> Router<AppState> {
    Router::new().route("/admin/audit-logs", get(list_audit_logs))
}

#[instrument(skip(state))]
pub async fn list_audit_logs(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    Query(q): Query<AuditQuery>,
) -> PortalResult<Json<Vec<AuditLogEntry>>> {
    who.require_admin()?;
    let rows = state.store.list_audit(q.limit.clamp(1, MAX_LIMIT)).await?;
    Ok(Json(rows))
}
