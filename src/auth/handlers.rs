use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tracing::instrument;

use super::dto::{
    AuthResponse, ChangePasswordRequest, LoginRequest, PublicUser, RefreshRequest,
    RegisterRequest,
};
use super::jwt::AuthUser;
use super::services;
use crate::{error::PortalResult, extract::Json, state::AppState};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

pub fn me_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_me))
        .route("/me/password", post(change_password))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> PortalResult<(StatusCode, Json<PublicUser>)> {
    let user = services::register(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> PortalResult<Json<AuthResponse>> {
    Ok(Json(services::login(&state, payload).await?))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> PortalResult<Json<AuthResponse>> {
    Ok(Json(services::refresh(&state, &payload.refresh_token).await?))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
) -> PortalResult<Json<PublicUser>> {
    Ok(Json(services::me(&state, &who).await?))
}

#[instrument(skip(state, payload))]
pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> PortalResult<Json<Value>> {
    services::change_password(&state, &who, payload).await?;
    Ok(Json(json!({ "message": "Password updated successfully" })))
}
