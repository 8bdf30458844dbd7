mod routes;
mod handlers;

pub use routes::{Paginated, PaginationParams};

use crate::auth::JwtService;
use crate::config::Config;
use crate::db::DbPool;
use crate::notify::Notifier;
use anyhow::Result;
use axum::{
    extract::FromRef,
    routing::{get, post, put},
    Router,
};
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Everything a request handler needs, cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub jwt: JwtService,
    pub notifier: Notifier,
}

impl AppState {
    pub fn new(db: DbPool, jwt: JwtService, notifier: Notifier) -> Self {
        Self { db, jwt, notifier }
    }
}

impl FromRef<AppState> for DbPool {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}

impl FromRef<AppState> for JwtService {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}

impl FromRef<AppState> for Notifier {
    fn from_ref(state: &AppState) -> Self {
        state.notifier.clone()
    }
}

/// Create router with all routes
pub fn build_router(state: AppState) -> Router {
    let config = Config::get();

    // Set up CORS
    let cors = if config.api.enable_cors {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::permissive()
    };

    Router::new()
        // General routes
        .route("/health", get(handlers::health::health_check))
        // Auth routes
        .route("/api/users/signup", post(handlers::users::signup))
        .route("/api/users/verify", post(handlers::users::verify_code))
        .route("/api/users/new-verify", post(handlers::users::new_verify_code))
        .route("/api/users/login", post(handlers::users::login))
        .route("/api/users/login/refresh", post(handlers::users::login_refresh))
        .route("/api/users/change-info", put(handlers::users::change_info))
        .route("/api/users/change-photo", put(handlers::users::change_photo))
        // Feed routes
        .route("/api/posts", get(handlers::posts::list_posts))
        .route("/api/posts/create", post(handlers::posts::create_post))
        .route(
            "/api/posts/:id",
            get(handlers::posts::retrieve_post)
                .put(handlers::posts::update_post)
                .delete(handlers::posts::delete_post),
        )
        .route(
            "/api/posts/:id/like-toggle",
            post(handlers::posts::post_like_toggle),
        )
        .route("/api/posts/comments", get(handlers::comments::list_comments))
        .route(
            "/api/posts/comments/create",
            post(handlers::comments::create_comment),
        )
        .route(
            "/api/posts/comments/:id",
            get(handlers::comments::retrieve_comment)
                .put(handlers::comments::update_comment)
                .delete(handlers::comments::delete_comment),
        )
        .route(
            "/api/posts/comments/:id/like-toggle",
            post(handlers::comments::comment_like_toggle),
        )
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Start the API server
pub async fn start_api_server(state: AppState) -> Result<()> {
    let config = Config::get();

    let app = build_router(state);

    // Get bind address
    let addr = format!("{}:{}", config.api.host, config.api.port).parse::<SocketAddr>()?;

    // Start server
    info!("Starting API server on {}", addr);
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received, stopping API server");
        })
        .await?;

    Ok(())
}
