mod handler;
mod model;

pub use handler::{check_rate_limit, get_rate_limit, remove_rate_limit, update_rate_limit};
pub use model::{
    CheckRateLimitRequest, CheckRateLimitResponse, RateLimitStatusResponse,
    RemoveRateLimitResponse, UpdateRateLimitRequest, UpdateRateLimitResponse,
};
