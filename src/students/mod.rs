use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod handlers;
pub mod import;
pub mod services;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::student_routes())
        .merge(handlers::admin_routes())
}
