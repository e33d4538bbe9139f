use std::time::Duration;

use axum::Json;
use serde::Serialize;

use crate::common::ApiResponse;

pub fn success_to_api_response<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        code: error_codes::SUCCESS,
        msg: "success".into(),
        resp_data: Some(data),
    })
}

pub fn error_to_api_response<T>(code: i32, msg: String) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        code,
        msg,
        resp_data: None,
    })
}

/// 窗口长度的文本形式，整秒用 `s`，否则用 `ms`
pub fn format_window(window: Duration) -> String {
    if window.subsec_millis() == 0 {
        format!("{}s", window.as_secs())
    } else {
        format!("{}ms", window.as_millis())
    }
}

pub mod error_codes {
    pub const SUCCESS: i32 = 0;
    pub const VALIDATION_ERROR: i32 = 1000;
    pub const NOT_FOUND: i32 = 1004;
    pub const INTERNAL_ERROR: i32 = 5000;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_labels() {
        assert_eq!(format_window(Duration::from_secs(10)), "10s");
        assert_eq!(format_window(Duration::from_millis(1500)), "1500ms");
        assert_eq!(format_window(Duration::from_millis(250)), "250ms");
        assert_eq!(format_window(Duration::ZERO), "0s");
    }
}
