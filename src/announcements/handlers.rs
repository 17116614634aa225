use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get},
    Router,
};
use serde_json::{json, Value};
use tracing::instrument;
use uuid::Uuid;

use super::dto::CreateAnnouncementRequest;
use super::repo_types::{Announcement, AnnouncementWithCourse};
use super::services;
use crate::{
    auth::jwt::AuthUser,
    error::PortalResult,
    extract::{Json, Path},
    state::AppState,
};

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/admin/announcements",
            get(list_announcements).post(create_announcement),
        )
        .route("/admin/announcements/:id", delete(delete_announcement))
}

pub fn student_routes() -> Router<AppState> {
    Router::new().route("/student/announcements", get(my_announcements))
}

#[instrument(skip(state, body))]
pub async fn create_announcement(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    Json(body): Json<CreateAnnouncementRequest>,
) -> PortalResult<(StatusCode, Json<Announcement>)> {
    let announcement = services::create_announcement(&state, &who, body).await?;
    Ok((StatusCode::CREATED, Json(announcement)))
}

#[instrument(skip(state))]
pub async fn list_announcements(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
) -> PortalResult<Json<Vec<AnnouncementWithCourse>>> {
    Ok(Json(services::list_announcements(&state, &who).await?))
}

#[instrument(skip(state))]
pub async fn delete_announcement(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    Path(id): Path<Uuid>,
) -> PortalResult<Json<Value>> {
    services::delete_announcement(&state, &who, id).await?;
    Ok(Json(json!({ "message": "Announcement deleted successfully" })))
}

#[instrument(skip(state))]
pub async fn my_announcements(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
) -> PortalResult<Json<Vec<AnnouncementWithCourse>>> {
    Ok(Json(services::my_announcements(&state, &who).await?))
}
