// src/main.rs

use std::sync::Arc;

use dotenvy::dotenv;
use exam_portal::config::Config;
use exam_portal::routes;
use exam_portal::services::user::seed_admin_user;
use exam_portal::state::AppState;
use exam_portal::store::{ExamStore, MemoryStore, PgStore};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file (if present)
    dotenv().ok();

    // Load configuration from environment
    let config = Config::from_env()?;

    let file_appender = tracing_appender::rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    let store: Arc<dyn ExamStore> = match &config.database_url {
        Some(database_url) => {
            let store = PgStore::connect(database_url, &config).await?;
            store.migrate().await?;
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store; data is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    // Seed Admin User
    if let Some(username) = &config.admin_username {
        if let Err(e) = seed_admin_user(store.as_ref(), username).await {
            tracing::error!("Failed to seed admin user: {}", e);
        }
    }

    let addr = config.bind_addr;
    let state = AppState { store, config };

    // Create the Axum application router
    let app = routes::create_router(state);

    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Start the server
    axum::serve(listener, app).await?;
    Ok(())
}
