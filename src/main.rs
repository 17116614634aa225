mod announcements;
mod app;
mod attendance;
mod audit;
mod auth;
mod config;
mod courses;
mod db;
mod enrollments;
mod error;
mod extract;
mod materials;
mod state;
mod students;
#[cfg(test)]
mod testing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "student_portal=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let state = state::AppState::init().await?;
    let config = state.config.clone();
    let audit = state.audit.clone();

    app::serve(app::build_app(state), &config).await?;

    // drain queued audit entries before exit
    audit.flush().await;
    tracing::info!("shutdown complete");
    Ok(())
}
