use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Router,
};
use serde_json::{json, Value};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{CatalogEntry, CourseDetail, CreateCourseRequest, UpdateCourseRequest};
use super::repo_types::{Course, CourseWithCount};
use super::services;
use crate::{
    auth::jwt::AuthUser,
    error::PortalResult,
    extract::{Json, Path},
    state::AppState,
};

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/courses", get(list_courses).post(create_course))
        .route(
            "/admin/courses/:id",
            get(get_course).patch(update_course).delete(delete_course),
        )
}

pub fn student_routes() -> Router<AppState> {
    Router::new().route("/student/courses", get(catalog))
}

#[instrument(skip(state))]
pub async fn list_courses(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
) -> PortalResult<Json<Vec<CourseWithCount>>> {
    Ok(Json(services::list_courses(&state, &who).await?))
}

#[instrument(skip(state, body))]
pub async fn create_course(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    Json(body): Json<CreateCourseRequest>,
) -> PortalResult<(StatusCode, Json<Course>)> {
    let course = services::create_course(&state, &who, body).await?;
    Ok((StatusCode::CREATED, Json(course)))
}

#[instrument(skip(state))]
pub async fn get_course(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    Path(id): Path<Uuid>,
) -> PortalResult<Json<CourseDetail>> {
    Ok(Json(services::get_course(&state, &who, id).await?))
}

#[instrument(skip(state, body))]
pub async fn update_course(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateCourseRequest>,
) -> PortalResult<Json<Course>> {
    Ok(Json(services::update_course(&state, &who, id, body).await?))
}

#[instrument(skip(state))]
pub async fn delete_course(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    Path(id): Path<Uuid>,
) -> PortalResult<Json<Value>> {
    services::delete_course(&state, &who, id).await?;
    Ok(Json(json!({ "message": "Course deleted successfully" })))
}

#[instrument(skip(state))]
pub async fn catalog(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
) -> PortalResult<Json<Vec<CatalogEntry>>> {
    Ok(Json(services::catalog(&state, &who).await?))
}
