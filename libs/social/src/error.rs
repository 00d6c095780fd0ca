//! Error types for the social core

use common::error::DatabaseError;
use thiserror::Error;

use crate::models::UserId;

/// Errors returned by friendship, leaderboard and directory operations
#[derive(Error, Debug)]
pub enum SocialError {
    /// Self-reference or unknown target user
    #[error("Invalid target user: {0}")]
    InvalidTarget(UserId),

    /// An edge of some kind already exists between the two users
    #[error("A friendship or pending request with user {0} already exists")]
    DuplicateRequest(UserId),

    /// No pending request matches
    #[error("No pending friend request involving user {0}")]
    RequestNotFound(UserId),

    /// Not friends with the given user
    #[error("User {0} is not a friend")]
    NotFriends(UserId),

    /// Malformed argument, such as a non-positive leaderboard bound
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The acting user, or the user whose progress is written, does not exist
    #[error("User not found: {0}")]
    UserNotFound(UserId),

    /// Storage failure
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

/// Type alias for Result with SocialError
pub type SocialResult<T> = Result<T, SocialError>;
