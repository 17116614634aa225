use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get, patch},
    Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{AssignGradeRequest, EnrollRequest};
use super::repo_types::{Enrollment, EnrollmentWithCourse};
use super::services;
use crate::{
    auth::jwt::AuthUser,
    error::PortalResult,
    extract::{Json, Path},
    state::AppState,
};

pub fn student_routes() -> Router<AppState> {
    Router::new()
        .route("/student/enrollments", get(list_mine).post(enroll))
        .route("/student/enrollments/:id", delete(drop_own))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/enrollments/:id/drop", patch(admin_drop))
        .route("/admin/enrollments/:id/grade", patch(assign_grade))
}

#[instrument(skip(state))]
pub async fn list_mine(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
) -> PortalResult<Json<Vec<EnrollmentWithCourse>>> {
    Ok(Json(services::my_enrollments(&state, &who).await?))
}

#[instrument(skip(state, body))]
pub async fn enroll(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    Json(body): Json<EnrollRequest>,
) -> PortalResult<(StatusCode, Json<EnrollmentWithCourse>)> {
    let enrollment = services::enroll(&state, &who, body.course_id).await?;
    Ok((StatusCode::CREATED, Json(enrollment)))
}

#[instrument(skip(state))]
pub async fn drop_own(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    Path(id): Path<Uuid>,
) -> PortalResult<Json<Enrollment>> {
    Ok(Json(services::drop_own(&state, &who, id).await?))
}

#[instrument(skip(state))]
pub async fn admin_drop(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    Path(id): Path<Uuid>,
) -> PortalResult<Json<Enrollment>> {
    Ok(Json(services::admin_drop(&state, &who, id).await?))
}

#[instrument(skip(state, body))]
pub async fn assign_grade(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<AssignGradeRequest>,
) -> PortalResult<Json<Enrollment>> {
    Ok(Json(services::assign_grade(&state, &who, id, body).await?))
}
