use std::net::SocketAddr;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::AppConfig;
use crate::state::AppState;
use crate::{announcements, attendance, audit, auth, courses, enrollments, materials, students};

pub fn api_router() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(students::router())
        .merge(courses::router())
        .merge(enrollments::router())
        .merge(attendance::router())
        .merge(announcements::router())
        .merge(materials::router())
        .merge(audit::router())
        .route("/health", get(|| async { "ok" }))
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", api_router())
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

/// Serves until ctrl-c.
pub async fn serve(app: Router, config: &AppConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::testing;

    async fn call(app: Router, req: Request<Body>) -> (StatusCode, Value) {
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(t) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn health_is_public() {
        let (state, _) = AppState::fake();
        let res = build_app(state)
            .oneshot(Request::get("/api/v1/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn admin_routes_require_a_token() {
        let (state, _) = AppState::fake();
        let (status, body) = call(
            build_app(state),
            Request::get("/api/v1/admin/courses").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Authentication required");
    }

    #[tokio::test]
    async fn student_token_is_forbidden_on_admin_routes() {
        let (state, _) = AppState::fake();
        let student = testing::seed_student(&state, "s@uni.edu").await;
        let token = testing::access_token(&state, &student);
        let (status, body) = call(
            build_app(state),
            json_request("GET", "/api/v1/admin/audit-logs", Some(&token), Value::Null),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "Administrator access required");
    }

    #[tokio::test]
    async fn register_then_login() {
        let (state, _) = AppState::fake();
        let app = build_app(state);

        let (status, body) = call(
            app.clone(),
            json_request(
                "POST",
                "/api/v1/auth/register",
                None,
                json!({ "name": "Ada", "email": "Ada@Uni.edu", "password": "Str0ng!Pass" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["email"], "ada@uni.edu");
        assert_eq!(body["role"], "STUDENT");

        let (status, body) = call(
            app,
            json_request(
                "POST",
                "/api/v1/auth/login",
                None,
                json!({ "email": "ada@uni.edu", "password": "Str0ng!Pass" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["access_token"].as_str().is_some());
    }

    #[tokio::test]
    async fn full_course_maps_to_bad_request() {
        let (state, _) = AppState::fake();
        let course = testing::seed_course(&state, "CS101", 1).await;
        let first = testing::seed_student(&state, "a@uni.edu").await;
        let second = testing::seed_student(&state, "b@uni.edu").await;
        let app = build_app(state.clone());

        let (status, _) = call(
            app.clone(),
            json_request(
                "POST",
                "/api/v1/student/enrollments",
                Some(&testing::access_token(&state, &first)),
                json!({ "course_id": course.id }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = call(
            app,
            json_request(
                "POST",
                "/api/v1/student/enrollments",
                Some(&testing::access_token(&state, &second)),
                json!({ "course_id": course.id }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Course is full");
    }

    #[tokio::test]
    async fn undecodable_bodies_are_bad_requests() {
        let (state, _) = AppState::fake();
        let student = testing::seed_student(&state, "s@uni.edu").await;
        let token = testing::access_token(&state, &student);
        let app = build_app(state);

        for body in [json!({}), json!({ "course_id": "not-a-uuid" })] {
            let (status, reply) = call(
                app.clone(),
                json_request("POST", "/api/v1/student/enrollments", Some(&token), body),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(reply["error"], "Request body has missing or invalid fields");
        }

        let req = Request::post("/api/v1/student/enrollments")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::from("{\"course_id\":"))
            .unwrap();
        let (status, reply) = call(app.clone(), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(reply["error"], "Request body is not valid JSON");

        let req = Request::post("/api/v1/student/enrollments")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::from("course_id=1"))
            .unwrap();
        let (status, reply) = call(app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(reply["error"], "Expected a JSON request body");
    }

    #[tokio::test]
    async fn bad_path_and_query_are_bad_requests() {
        let (state, _) = AppState::fake();
        let admin = testing::seed_admin(&state).await;
        let token = testing::access_token(&state, &admin);
        let app = build_app(state);

        let (status, reply) = call(
            app.clone(),
            json_request("GET", "/api/v1/admin/courses/not-a-uuid", Some(&token), Value::Null),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(reply["error"], "Invalid path parameter");

        let (status, reply) = call(
            app,
            json_request(
                "GET",
                "/api/v1/admin/attendance?course_id=nope",
                Some(&token),
                Value::Null,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(reply["error"], "Invalid query parameters");
    }
}
