//! Test helpers for els-client integration tests.

use els_core::config::{BackoffShape, ClientConfig, RetryConfig};
use els_core::output::{MemorySink, SessionLog};

use std::sync::Arc;

pub fn sh(script: &str) -> Vec<String> {
    vec!["sh".to_string(), "-c".to_string(), script.to_string()]
}

/// Config against 127.0.0.1 with the given query, launch and retry timing.
pub fn config(port_query: Vec<String>, launch: Vec<String>, wait_ms: u64, max_attempts: u32) -> ClientConfig {
    let mut config = ClientConfig {
        host: "127.0.0.1".to_string(),
        port_query,
        retry: RetryConfig {
            policy: BackoffShape::Fixed,
            max_attempts: Some(max_attempts),
            wait_ms,
            ..RetryConfig::default()
        },
        ..ClientConfig::default()
    };
    config.launch.normal = launch.clone();
    config.launch.debug = launch;
    config
}

pub fn memory_log() -> (MemorySink, SessionLog) {
    let sink = MemorySink::new();
    let log = SessionLog::new(Arc::new(sink.clone()));
    (sink, log)
}

/// Pid from the first "Launched els server pid=" line in `output`.
pub fn launched_pid(output: &str) -> Option<u32> {
    output
        .lines()
        .find_map(|line| line.strip_prefix("Launched els server pid="))
        .and_then(|pid| pid.trim().parse().ok())
}
