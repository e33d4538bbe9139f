use std::sync::Arc;

use config::Config;
use limiter::RateLimitService;

pub mod cache;
pub mod common;
pub mod config;
pub mod database;
pub mod error;
pub mod limiter;
pub mod middleware;
pub mod router;
pub mod routes;
pub mod utils;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub limiter: Arc<RateLimitService>,
}
