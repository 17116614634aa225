use axum::{extract::State, routing::get, Router};
use tracing::instrument;

use super::dto::{
    CourseAttendanceSummary, CourseDayQuery, MarkAttendanceRequest, MarkAttendanceResponse,
    PercentageQuery, PercentageResponse,
};
use super::repo_types::AttendanceRecord;
use super::services;
use crate::{
    auth::jwt::AuthUser,
    error::PortalResult,
    extract::{Json, Query},
    state::AppState,
};

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/attendance", get(course_attendance).post(mark_attendance))
        .route("/admin/attendance/percentage", get(percentage))
}

pub fn student_routes() -> Router<AppState> {
    Router::new().route("/student/attendance", get(my_attendance))
}

#[instrument(skip(state, body))]
pub async fn mark_attendance(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    Json(body): Json<MarkAttendanceRequest>,
) -> PortalResult<Json<MarkAttendanceResponse>> {
    Ok(Json(services::mark_attendance(&state, &who, body).await?))
}

#[instrument(skip(state))]
pub async fn course_attendance(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    Query(q): Query<CourseDayQuery>,
) -> PortalResult<Json<Vec<AttendanceRecord>>> {
    Ok(Json(
        services::course_attendance(&state, &who, q.course_id, &q.date).await?,
    ))
}

#[instrument(skip(state))]
pub async fn percentage(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    Query(q): Query<PercentageQuery>,
) -> PortalResult<Json<PercentageResponse>> {
    let percentage = services::percentage_for(&state, &who, q.student_id, q.course_id).await?;
    Ok(Json(PercentageResponse {
        student_id: q.student_id,
        course_id: q.course_id,
        percentage,
        at_risk: services::is_at_risk(percentage),
    }))
}

#[instrument(skip(state))]
pub async fn my_attendance(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
) -> PortalResult<Json<Vec<CourseAttendanceSummary>>> {
    Ok(Json(services::my_attendance(&state, &who).await?))
}
