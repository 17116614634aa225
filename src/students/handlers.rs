use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    routing::{get, patch, post},
    Router,
};
use serde_json::{json, Value};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{AccountView, ImportReport, StudentDetail, UpdateProfileRequest, UserDirectory};
use super::{import, services};
use crate::{
    auth::{
        dto::{PublicUser, RegisterRequest},
        jwt::AuthUser,
        repo_types::StudentSummary,
    },
    error::{PortalError, PortalResult},
    extract::{Json, Multipart, Path},
    state::AppState,
};

const MAX_IMPORT_BYTES: usize = 5 * 1024 * 1024;

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/students", get(list_students).post(create_user))
        .route("/admin/users", get(list_users).post(create_user))
        .route("/admin/students/:id", get(get_student).delete(delete_student))
        .route("/admin/students/:id/profile", patch(admin_update_profile))
        .route(
            "/admin/students/import",
            post(bulk_import).layer(DefaultBodyLimit::max(MAX_IMPORT_BYTES)),
        )
}

pub fn student_routes() -> Router<AppState> {
    Router::new().route("/student/profile", get(get_profile).patch(update_profile))
}

#[instrument(skip(state, body))]
pub async fn create_user(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    Json(body): Json<RegisterRequest>,
) -> PortalResult<(StatusCode, Json<PublicUser>)> {
    let user = services::create_user(&state, &who, body).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
) -> PortalResult<Json<UserDirectory>> {
    Ok(Json(services::list_users(&state, &who).await?))
}

#[instrument(skip(state))]
pub async fn list_students(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
) -> PortalResult<Json<Vec<StudentSummary>>> {
    Ok(Json(services::list_students(&state, &who).await?))
}

#[instrument(skip(state))]
pub async fn get_student(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    Path(id): Path<Uuid>,
) -> PortalResult<Json<StudentDetail>> {
    Ok(Json(services::get_student(&state, &who, id).await?))
}

#[instrument(skip(state))]
pub async fn delete_student(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    Path(id): Path<Uuid>,
) -> PortalResult<Json<Value>> {
    services::delete_student(&state, &who, id).await?;
    Ok(Json(json!({ "message": "Student deleted successfully" })))
}

#[instrument(skip(state, body))]
pub async fn admin_update_profile(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateProfileRequest>,
) -> PortalResult<Json<AccountView>> {
    Ok(Json(services::admin_update_profile(&state, &who, id, body).await?))
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
) -> PortalResult<Json<AccountView>> {
    Ok(Json(services::get_profile(&state, &who).await?))
}

#[instrument(skip(state, body))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    Json(body): Json<UpdateProfileRequest>,
) -> PortalResult<Json<AccountView>> {
    Ok(Json(services::update_profile(&state, &who, body).await?))
}

/// Multipart upload with the CSV in field `file`.
#[instrument(skip(state, mp))]
pub async fn bulk_import(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    Multipart(mut mp): Multipart,
) -> PortalResult<Json<ImportReport>> {
    let mut data = None;
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| PortalError::invalid(format!("Invalid multipart body: {e}")))?
    {
        if field.name() == Some("file") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| PortalError::invalid(format!("Invalid multipart body: {e}")))?;
            data = Some(bytes);
        }
    }
    let data = data.ok_or_else(|| PortalError::invalid("No file uploaded"))?;
    Ok(Json(import::bulk_import(&state, &who, &data).await?))
}
