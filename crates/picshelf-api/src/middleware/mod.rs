pub mod rate_limit;
pub mod request_log;
pub mod trailing_slash;

pub use rate_limit::{rate_limit_middleware, HttpRateLimiter};
pub use request_log::request_log_middleware;
pub use trailing_slash::strip_trailing_slash;
