use anyhow::Result;
use jsonwebtoken::DecodingKey;
use social::{FriendshipEngine, LeaderboardQuery, PgDirectory};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod error;
mod middleware;
mod models;
mod routes;
mod settings;
mod state;

use common::database::{health_check, init_pool};

use crate::{settings::Settings, state::AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting social API service");

    let settings = Settings::load()?;

    // Initialize database connection pool
    let pool = init_pool(&settings.database).await?;

    // Check database connectivity
    if health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    let jwt_key = DecodingKey::from_rsa_pem(settings.jwt.public_key_pem()?.as_bytes())?;

    let directory = PgDirectory::new(pool.clone());
    let cache_ttl = settings.leaderboard.cache_ttl();
    info!("Leaderboard cache TTL: {:?}", cache_ttl);

    let app_state = AppState {
        db_pool: pool,
        friendships: FriendshipEngine::new(directory.clone()),
        leaderboard: LeaderboardQuery::with_cache(directory, cache_ttl),
        jwt_key,
    };

    // Start the web server
    let app = routes::create_router(app_state);

    let address = settings.server.address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("Social API service listening on {}", address);

    axum::serve(listener, app).await?;

    Ok(())
}
