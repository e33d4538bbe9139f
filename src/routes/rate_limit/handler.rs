use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};

use crate::{
    AppState,
    common::ApiResponse,
    error::AppError,
    limiter::with_deadline,
    utils::success_to_api_response,
};

use super::model::{
    CheckRateLimitRequest, CheckRateLimitResponse, RateLimitStatusResponse,
    RemoveRateLimitResponse, UpdateRateLimitRequest, UpdateRateLimitResponse,
};

#[axum::debug_handler]
pub async fn check_rate_limit(
    State(state): State<AppState>,
    payload: Result<Json<CheckRateLimitRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<CheckRateLimitResponse>>, AppError> {
    let Json(req) = payload?;
    let limit = req.limit.unwrap_or(0);
    let allowed = with_deadline(
        state.config.request_timeout(),
        "check rate limit",
        state.limiter.decide(&req.user_id, limit),
    )
    .await?;

    tracing::debug!("user {} allowed={}", req.user_id, allowed);
    Ok(success_to_api_response(CheckRateLimitResponse {
        allowed,
        message: "Rate limit checked".to_string(),
    }))
}

#[axum::debug_handler]
pub async fn get_rate_limit(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ApiResponse<RateLimitStatusResponse>>, AppError> {
    let status = with_deadline(
        state.config.request_timeout(),
        "get rate limit",
        state.limiter.get_status(&user_id),
    )
    .await?;

    Ok(success_to_api_response(status.into()))
}

#[axum::debug_handler]
pub async fn update_rate_limit(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    payload: Result<Json<UpdateRateLimitRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<UpdateRateLimitResponse>>, AppError> {
    let Json(req) = payload?;
    with_deadline(
        state.config.request_timeout(),
        "update rate limit",
        state.limiter.set_limit(&user_id, req.new_limit),
    )
    .await?;

    Ok(success_to_api_response(UpdateRateLimitResponse {
        user_id,
        updated_limit: req.new_limit,
        message: "User rate limit updated successfully".to_string(),
    }))
}

#[axum::debug_handler]
pub async fn remove_rate_limit(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ApiResponse<RemoveRateLimitResponse>>, AppError> {
    with_deadline(
        state.config.request_timeout(),
        "remove rate limit",
        state.limiter.remove_limit(&user_id),
    )
    .await?;

    Ok(success_to_api_response(RemoveRateLimitResponse {
        user_id,
        message: "User rate limit removed".to_string(),
    }))
}
