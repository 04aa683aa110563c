use crate::config::{BackoffShape, RetryConfig};
use crate::connect::policy::{DEFAULT_EXPONENTIAL_CAP_FACTOR, LinearBackoff, build_backoff};

use std::time::Duration;

use backoff::backoff::Backoff;

fn retry(policy: BackoffShape) -> RetryConfig {
    RetryConfig {
        policy,
        max_attempts: Some(5),
        wait_ms: 60_000,
        step_ms: 100,
        max_wait_ms: None,
    }
}

/// **VALUE**: The linear policy waits `step * attempt`.
///
/// **BUG THIS CATCHES**: An off-by-one that makes the first wait zero would
/// turn the first retry cycle into a busy relaunch.
#[test]
fn given_linear_backoff_when_polled_then_grows_by_step() {
    // GIVEN: A 100ms step
    let mut backoff = LinearBackoff::new(Duration::from_millis(100), None);

    // WHEN: Asking for three waits
    let waits: Vec<_> = (0..3).filter_map(|_| backoff.next_backoff()).collect();

    // THEN: 100, 200, 300
    assert_eq!(
        waits,
        [
            Duration::from_millis(100),
            Duration::from_millis(200),
            Duration::from_millis(300)
        ]
    );
}

#[test]
fn given_linear_backoff_with_cap_when_polled_past_cap_then_stays_at_cap() {
    let mut backoff = LinearBackoff::new(Duration::from_secs(1), Some(Duration::from_millis(2500)));

    let waits: Vec<_> = (0..4).filter_map(|_| backoff.next_backoff()).collect();

    assert_eq!(waits[1], Duration::from_secs(2));
    assert_eq!(waits[2], Duration::from_millis(2500));
    assert_eq!(waits[3], Duration::from_millis(2500));

    backoff.reset();
    assert_eq!(backoff.next_backoff(), Some(Duration::from_secs(1)));
}

#[test]
fn given_fixed_policy_when_built_then_every_wait_is_wait_ms() {
    let mut backoff = build_backoff(&retry(BackoffShape::Fixed));

    for _ in 0..3 {
        assert_eq!(backoff.next_backoff(), Some(Duration::from_secs(60)));
    }
}

/// **VALUE**: The unbounded mode relies on exponential waits starting at the
/// configured wait, never exceeding the cap and never running dry.
///
/// **BUG THIS CATCHES**: Would catch the sequence starting from `step_ms`
/// instead of `wait_ms`.
#[test]
fn given_exponential_policy_when_built_then_doubles_from_wait_up_to_cap() {
    // GIVEN: 5s initial wait, 1s step, capped at 60s
    let mut config = retry(BackoffShape::Exponential);
    config.wait_ms = 5_000;
    config.step_ms = 1_000;
    config.max_wait_ms = Some(60_000);
    let mut backoff = build_backoff(&config);

    // WHEN: Polling six times
    let waits: Vec<Option<u128>> = (0..6)
        .map(|_| backoff.next_backoff().map(|w| w.as_millis()))
        .collect();

    // THEN: 5, 10, 20, 40, then clamped at 60 without ever returning None
    assert_eq!(
        waits,
        [
            Some(5_000),
            Some(10_000),
            Some(20_000),
            Some(40_000),
            Some(60_000),
            Some(60_000)
        ]
    );
}

#[test]
fn given_exponential_policy_without_cap_when_built_then_caps_at_sixteen_waits() {
    let mut config = retry(BackoffShape::Exponential);
    config.wait_ms = 100;
    let mut backoff = build_backoff(&config);

    let waits: Vec<u128> = (0..7)
        .filter_map(|_| backoff.next_backoff().map(|w| w.as_millis()))
        .collect();

    assert_eq!(waits, [100, 200, 400, 800, 1_600, 1_600, 1_600]);
    assert_eq!(u128::from(DEFAULT_EXPONENTIAL_CAP_FACTOR) * 100, 1_600);
}
