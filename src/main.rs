use anyhow::Result;
use dotenv::dotenv;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use photogram_api::api::{self, AppState};
use photogram_api::auth::JwtService;
use photogram_api::config::Config;
use photogram_api::db::init_database;
use photogram_api::notify;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file if present
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,photogram_api=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::init()?;
    info!("Initialized configuration");

    // Initialize database
    let db = init_database().await?;
    info!("Connected to database");

    // Start the verification-code delivery worker
    let notifier = notify::spawn_notifier();

    let state = AppState::new(
        db.get_pool().clone(),
        JwtService::from_config(&config.jwt),
        notifier,
    );

    // Serve until ctrl-c
    api::start_api_server(state).await?;

    info!("Photogram API shutdown complete");
    Ok(())
}
