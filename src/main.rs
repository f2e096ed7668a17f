//! Minerva - A blog backend with token auth and unique-slug posts

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use minerva::{
    api::{self, AppState},
    config::Config,
    db::{
        self,
        repositories::{SqlxAccountRepository, SqlxPostRepository},
    },
    services::{AuthService, PasswordService, PostService, TokenService},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "minerva=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Minerva blog backend...");

    // Load configuration
    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {}", config.database.url);

    // Run migrations
    db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    // Create repositories
    let account_repo = SqlxAccountRepository::boxed(pool.clone());
    let post_repo = SqlxPostRepository::boxed(pool.clone());

    // Initialize services
    let password_service = PasswordService::new(&config.auth)?;
    let token_service = TokenService::new(&config.auth);
    let auth_service = Arc::new(AuthService::new(
        account_repo,
        password_service,
        token_service,
        config.auth.allow_registration,
        config.auth.default_role,
    ));
    let post_service = Arc::new(PostService::new(post_repo, config.upload.clone()));

    // Build application state
    let state = AppState {
        auth_service,
        post_service,
        upload_config: Arc::new(config.upload.clone()),
    };

    let app = api::build_router(state, &config);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
