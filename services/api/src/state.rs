//! Application state shared across handlers

use jsonwebtoken::DecodingKey;
use social::{FriendshipEngine, LeaderboardQuery, PgDirectory};
use sqlx::PgPool;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub friendships: FriendshipEngine<PgDirectory>,
    pub leaderboard: LeaderboardQuery<PgDirectory>,
    pub jwt_key: DecodingKey,
}
