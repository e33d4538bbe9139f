use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::limiter::LimiterError;
use crate::utils::{error_codes, error_to_api_response};

/// 接口层错误
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    NotFound(String),
    InternalServerError(String),
}

impl From<LimiterError> for AppError {
    fn from(e: LimiterError) -> Self {
        match e {
            LimiterError::Validation(msg) => AppError::Validation(msg),
            LimiterError::NotFound(user_id) => {
                AppError::NotFound(format!("用户 {} 没有限流记录", user_id))
            }
            other => {
                tracing::error!("Rate limit operation failed: {}", other);
                AppError::InternalServerError(other.to_string())
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, msg) = match self {
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, error_codes::VALIDATION_ERROR, msg)
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, error_codes::NOT_FOUND, msg),
            AppError::InternalServerError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_codes::INTERNAL_ERROR,
                format!("内部服务器错误: {}", msg),
            ),
        };

        (status, error_to_api_response::<()>(code, msg)).into_response()
    }
}
