//! Outbound call discipline: per-service rate limiting, centralized retry,
//! and randomized pacing between sends.

pub mod gate;
pub mod pacer;
pub mod rate_limiter;
pub mod retry;

pub use gate::ServiceGate;
pub use pacer::{FixedPacer, Pacer, UniformPacer};
pub use rate_limiter::RateLimiter;
pub use retry::{Backoff, RetryPolicy, Retryable};
