use std::time::Duration;

use rand::Rng;

/// Decides how long to wait after a transmission before starting the next one.
pub trait Pacer: Send + Sync {
    fn next_delay(&self) -> Duration;
}

/// Draws each delay uniformly from `[min, max]` so outbound mail does not
/// follow a fixed cadence.
#[derive(Debug, Clone, Copy)]
pub struct UniformPacer {
    min: Duration,
    max: Duration,
}

impl UniformPacer {
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }
}

impl Pacer for UniformPacer {
    fn next_delay(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        let millis = rand::thread_rng().gen_range(self.min.as_millis()..=self.max.as_millis());
        Duration::from_millis(millis as u64)
    }
}

/// Always the same delay. Useful for tests and for disabling pacing.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedPacer(pub Duration);

impl Pacer for FixedPacer {
    fn next_delay(&self) -> Duration {
        self.0
    }
}
