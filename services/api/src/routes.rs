//! API service routes

use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{delete, get, post},
};
use serde_json::json;
use social::{DEFAULT_LIMIT, UserId};
use tracing::info;
use uuid::Uuid;

use crate::{
    error::ApiResult,
    middleware::{AuthUser, auth_middleware},
    models::{LeaderboardQueryParams, ListResponse, MessageResponse},
    state::AppState,
};

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/friends", get(list_friends))
        .route("/friends/:user_id", delete(remove_friend))
        .route("/friends/requests", get(list_incoming_requests))
        .route("/friends/requests/sent", get(list_outgoing_requests))
        .route(
            "/friends/requests/:user_id",
            post(send_request).delete(cancel_request),
        )
        .route("/friends/requests/:user_id/accept", post(accept_request))
        .route("/friends/requests/:user_id/decline", post(decline_request))
        .route("/leaderboard", get(leaderboard))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .merge(protected_routes)
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = common::database::health_check(&state.db_pool)
        .await
        .unwrap_or(false);

    let status = if database {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if database { "ok" } else { "degraded" },
            "service": "social-api",
            "database": database,
        })),
    )
}

/// Friends of the current user
pub async fn list_friends(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    let friends = state.friendships.list_friends(user.id).await?;
    Ok(Json(ListResponse::new(friends)))
}

/// Pending requests received by the current user
pub async fn list_incoming_requests(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    let requests = state.friendships.list_incoming_requests(user.id).await?;
    Ok(Json(ListResponse::new(requests)))
}

/// Pending requests sent by the current user
pub async fn list_outgoing_requests(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    let requests = state.friendships.list_outgoing_requests(user.id).await?;
    Ok(Json(ListResponse::new(requests)))
}

/// Send a friend request
pub async fn send_request(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(target): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    state
        .friendships
        .send_request(user.id, UserId(target))
        .await?;
    info!("User {} sent a friend request to {}", user.id, target);

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("Friend request sent")),
    ))
}

/// Withdraw a friend request the current user sent
pub async fn cancel_request(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(target): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    state
        .friendships
        .cancel_request(user.id, UserId(target))
        .await?;

    Ok(Json(MessageResponse::new("Friend request cancelled")))
}

/// Accept a friend request
pub async fn accept_request(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(requester): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    state
        .friendships
        .accept_request(user.id, UserId(requester))
        .await?;
    info!("User {} accepted a friend request from {}", user.id, requester);

    Ok(Json(MessageResponse::new("Friend request accepted")))
}

/// Decline a friend request
pub async fn decline_request(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(requester): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    state
        .friendships
        .decline_request(user.id, UserId(requester))
        .await?;

    Ok(Json(MessageResponse::new("Friend request declined")))
}

/// Remove a friend
pub async fn remove_friend(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(friend): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    state
        .friendships
        .remove_friend(user.id, UserId(friend))
        .await?;
    info!("User {} removed friend {}", user.id, friend);

    Ok(Json(MessageResponse::new("Friend removed")))
}

/// Top users by XP
pub async fn leaderboard(
    State(state): State<AppState>,
    Query(params): Query<LeaderboardQueryParams>,
) -> ApiResult<impl IntoResponse> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
    let entries = state.leaderboard.top_users(limit).await?;
    Ok(Json(ListResponse::new(entries)))
}
