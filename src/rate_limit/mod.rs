pub mod limiter;
pub mod middleware;

pub use limiter::{
    KeyPolicy, OnLimitReached, QuotaStatus, RateLimitDecision, RateLimiter, RateLimiterConfig,
    RemoteAddrPolicy, RequestInfo,
};
pub use middleware::rate_limit_middleware;
