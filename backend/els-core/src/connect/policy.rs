use crate::config::{BackoffShape, RetryConfig};

use std::time::Duration;

use backoff::ExponentialBackoffBuilder;
use backoff::backoff::{Backoff, Constant};

const EXPONENTIAL_MULTIPLIER: f64 = 2.0;

/// Exponential cap, as a multiple of the initial wait, when no
/// `max_wait_ms` is configured.
pub const DEFAULT_EXPONENTIAL_CAP_FACTOR: u32 = 16;

/// Waits `step * n` before the n-th retry, optionally capped at `max`.
#[derive(Debug, Clone)]
pub struct LinearBackoff {
    step: Duration,
    max: Option<Duration>,
    attempt: u32,
}

impl LinearBackoff {
    pub fn new(step: Duration, max: Option<Duration>) -> Self {
        Self {
            step,
            max,
            attempt: 0,
        }
    }
}

impl Backoff for LinearBackoff {
    fn reset(&mut self) {
        self.attempt = 0;
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        self.attempt = self.attempt.saturating_add(1);
        let wait = self.step.saturating_mul(self.attempt);
        Some(self.max.map_or(wait, |max| wait.min(max)))
    }
}

/// Build the wait sequence configured for the connect loop.
///
/// None of the shapes ever runs dry on its own; the attempt budget in
/// [`RetryConfig::max_attempts`] is what bounds the loop.
pub fn build_backoff(retry: &RetryConfig) -> Box<dyn Backoff + Send> {
    match retry.policy {
        BackoffShape::Fixed => Box::new(Constant::new(retry.wait())),
        BackoffShape::Linear => Box::new(LinearBackoff::new(retry.step(), retry.max_wait())),
        BackoffShape::Exponential => Box::new(
            ExponentialBackoffBuilder::new()
                .with_initial_interval(retry.wait())
                .with_multiplier(EXPONENTIAL_MULTIPLIER)
                .with_randomization_factor(0.0)
                .with_max_interval(exponential_cap(retry))
                .with_max_elapsed_time(None)
                .build(),
        ),
    }
}

fn exponential_cap(retry: &RetryConfig) -> Duration {
    retry.max_wait().unwrap_or_else(|| {
        retry
            .wait()
            .saturating_mul(DEFAULT_EXPONENTIAL_CAP_FACTOR)
    })
}
