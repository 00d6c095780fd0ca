//! API models for request and response payloads

use serde::{Deserialize, Serialize};

/// Envelope for list endpoints
#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub success: bool,
    pub count: usize,
    pub data: Vec<T>,
}

impl<T> ListResponse<T> {
    pub fn new(data: Vec<T>) -> Self {
        Self {
            success: true,
            count: data.len(),
            data,
        }
    }
}

/// Envelope for mutations
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Query parameters for the leaderboard
#[derive(Debug, Clone, Deserialize)]
pub struct LeaderboardQueryParams {
    /// Number of entries to return
    pub limit: Option<i64>,
}
