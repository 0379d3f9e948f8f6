use std::time::Duration;

/// How the wait between attempts grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// `base` before every retry.
    Fixed,
    /// `base × n` before retry n.
    Linear,
    /// `base × 2^(n-1)` before retry n.
    Exponential,
}

/// Bounded retry policy applied by a `ServiceGate` to one external service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            backoff,
        }
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let retry = retry.max(1);
        match self.backoff {
            Backoff::Fixed => self.base_delay,
            Backoff::Linear => self.base_delay * retry,
            Backoff::Exponential => self.base_delay * (1u32 << (retry - 1).min(16)),
        }
    }
}

/// Errors that know whether repeating the call could help.
pub trait Retryable {
    fn is_transient(&self) -> bool;
}
