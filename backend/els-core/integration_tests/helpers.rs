//! Test helpers for els-core integration tests.
//!
//! Servers are stand-in `sh` scripts; they can write to fd 3 to report a port.

use els_core::config::{BackoffShape, ClientConfig, RetryConfig};
use els_core::output::{MemorySink, SessionLog};

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::time::{sleep, timeout};

/// Argument vector running `script` through `sh -c`.
pub fn sh(script: &str) -> Vec<String> {
    vec!["sh".to_string(), "-c".to_string(), script.to_string()]
}

/// A port nothing listens on (bound, then released).
pub async fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind ephemeral port");
    listener.local_addr().expect("listener has an address").port()
}

/// Config with fast linear retries against 127.0.0.1.
pub fn fast_config(port_query: Vec<String>, launch: Vec<String>, max_attempts: u32) -> ClientConfig {
    let mut config = ClientConfig {
        host: "127.0.0.1".to_string(),
        port_query,
        retry: RetryConfig {
            policy: BackoffShape::Linear,
            max_attempts: Some(max_attempts),
            wait_ms: 50,
            step_ms: 10,
            max_wait_ms: Some(50),
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

/// Poll `sink` until it contains `needle`, failing after five seconds.
pub async fn wait_for_output(sink: &MemorySink, needle: &str) {
    let found = timeout(Duration::from_secs(5), async {
        while !sink.contents().contains(needle) {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await;

    assert!(
        found.is_ok(),
        "'{needle}' never appeared in output:\n{}",
        sink.contents()
    );
}
