use axum::{
    Router,
    routing::{get, post},
};

use crate::{AppState, middleware::log_errors, routes};

// 限流相关的路由
pub fn rate_limit_routes() -> Router<AppState> {
    Router::new()
        .route("/rate-limit/check", post(routes::rate_limit::check_rate_limit))
        .route(
            "/rate-limit/{user_id}",
            get(routes::rate_limit::get_rate_limit)
                .put(routes::rate_limit::update_rate_limit)
                .delete(routes::rate_limit::remove_rate_limit),
        )
}

// 创建主路由
pub fn create_router(state: AppState) -> Router {
    let base = state.config.api_base_uri.trim_end_matches('/').to_string();

    // axum 不允许在根路径上 nest
    let router = if base.is_empty() {
        Router::new().merge(rate_limit_routes())
    } else {
        Router::new().nest(&base, rate_limit_routes())
    };

    let router = router.layer(axum::middleware::from_fn(log_errors));

    // 根据编译模式决定是否添加CORS
    #[cfg(debug_assertions)]
    let router = {
        tracing::debug!("Adding CORS layer for development mode");
        router.layer(tower_http::cors::CorsLayer::permissive())
    };

    router.with_state(state)
}
