use crate::ELS_CLIENT_NAME;
use crate::ELS_SERVER_HOSTNAME;
use crate::error::config::ConfigError;

use common::ErrorLocation;

use std::panic::Location;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{info, warn};
use serde::{Deserialize, Serialize};

const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_VERSION: u32 = 1;
const LOG_DIR_NAME: &str = "logs";

// ============================================
// ENUMS WITH DEFAULTS
// ============================================

/// Shape of the wait between two connect attempts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BackoffShape {
    /// Same wait every cycle; a liveness heartbeat.
    Fixed,
    /// `step * attempt`, optionally capped.
    Linear,
    /// Doubling from `wait`, capped at `max_wait` (16 x `wait` when unset).
    Exponential,
}

impl Default for BackoffShape {
    fn default() -> Self {
        BackoffShape::Fixed
    }
}

// ============================================
// CONFIG STRUCTS
// ============================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnvOverride {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchConfig {
    #[serde(default = "default_normal_command")]
    pub normal: Vec<String>,
    #[serde(default = "default_debug_command")]
    pub debug: Vec<String>,
    #[serde(default = "default_debug_env")]
    pub debug_env: EnvOverride,
    /// Hand this process's stdin to the server. Off when stdin is already
    /// taken, e.g. by a stdio bridge; the server then reads end of file.
    #[serde(default = "default_inherit_stdin")]
    pub inherit_stdin: bool,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            normal: default_normal_command(),
            debug: default_debug_command(),
            debug_env: default_debug_env(),
            inherit_stdin: default_inherit_stdin(),
        }
    }
}

impl LaunchConfig {
    /// Argument vector for the requested mode.
    pub fn command(&self, debug: bool) -> &[String] {
        if debug { &self.debug } else { &self.normal }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default)]
    pub policy: BackoffShape,
    /// `None` retries forever.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: Option<u32>,
    #[serde(default = "default_wait_ms")]
    pub wait_ms: u64,
    #[serde(default = "default_step_ms")]
    pub step_ms: u64,
    #[serde(default)]
    pub max_wait_ms: Option<u64>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            policy: BackoffShape::default(),
            max_attempts: default_max_attempts(),
            wait_ms: default_wait_ms(),
            step_ms: default_step_ms(),
            max_wait_ms: None,
        }
    }
}

impl RetryConfig {
    pub fn wait(&self) -> Duration {
        Duration::from_millis(self.wait_ms)
    }

    pub fn step(&self) -> Duration {
        Duration::from_millis(self.step_ms)
    }

    pub fn max_wait(&self) -> Option<Duration> {
        self.max_wait_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Launch the debug command line with verbose server logging.
    #[serde(default)]
    pub debug: bool,

    /// Never spawn the server; it is managed externally.
    #[serde(default)]
    pub no_launch: bool,

    #[serde(default = "default_host")]
    pub host: String,

    /// Command printing the configured port on stdout.
    #[serde(default = "default_port_query")]
    pub port_query: Vec<String>,

    #[serde(default)]
    pub launch: LaunchConfig,

    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            debug: false,
            no_launch: false,
            host: default_host(),
            port_query: default_port_query(),
            launch: LaunchConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

// ============================================
// DEFAULT FUNCTIONS
// ============================================

fn default_version() -> u32 {
    CONFIG_VERSION
}
fn default_host() -> String {
    ELS_SERVER_HOSTNAME.to_string()
}
fn default_port_query() -> Vec<String> {
    argv(&["epm", "x", "edhm", "els/config/port"])
}
fn default_normal_command() -> Vec<String> {
    argv(&["/usr/bin/env", "epm", "x", "els"])
}
fn default_debug_command() -> Vec<String> {
    argv(&["/usr/bin/env", "stack", "run", "els"])
}
fn default_debug_env() -> EnvOverride {
    EnvOverride {
        name: "EDH_LOG_LEVEL".to_string(),
        value: "DEBUG".to_string(),
    }
}
fn default_inherit_stdin() -> bool {
    true
}
fn default_max_attempts() -> Option<u32> {
    Some(10)
}
fn default_wait_ms() -> u64 {
    60_000
}
fn default_step_ms() -> u64 {
    1_000
}

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

// ============================================
// IMPLEMENTATION
// ============================================

impl ClientConfig {
    /// Load config from {config_dir}/config.json.
    ///
    /// A missing file yields defaults. A file that exists but cannot be read,
    /// parsed or validated is an error.
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            info!(
                "Config file not found at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path).map_err(|e| {
            warn!("Failed to read config file: {e}");
            ConfigError::ReadError {
                location: ErrorLocation::from(Location::caller()),
                path: config_path.clone(),
                source: e,
            }
        })?;

        let config: ClientConfig = serde_json::from_str(&contents).map_err(|e| {
            warn!("Failed to parse config JSON: {e}");
            ConfigError::ParseError {
                location: ErrorLocation::from(Location::caller()),
                path: config_path.clone(),
                reason: e.to_string(),
            }
        })?;

        config.validate()?;

        info!("Config loaded from {}", config_path.display());
        Ok(config)
    }

    /// Validate config values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version == 0 || self.version > CONFIG_VERSION {
            return Err(validation(format!(
                "Invalid version: {} (expected 1-{CONFIG_VERSION})",
                self.version
            )));
        }

        if self.host.trim().is_empty() {
            return Err(validation("host cannot be empty"));
        }

        if self.port_query.is_empty() {
            return Err(validation("port_query command cannot be empty"));
        }

        if self.launch.normal.is_empty() || self.launch.debug.is_empty() {
            return Err(validation("launch commands cannot be empty"));
        }

        if self.launch.debug_env.name.is_empty() {
            return Err(validation("launch.debug_env.name cannot be empty"));
        }

        if self.retry.max_attempts == Some(0) {
            return Err(validation(
                "retry.max_attempts must be at least 1 (use null for unbounded)",
            ));
        }

        if self.retry.wait_ms == 0 || self.retry.step_ms == 0 {
            return Err(validation("retry wait_ms and step_ms must be positive"));
        }

        if self.retry.max_wait_ms == Some(0) {
            return Err(validation("retry.max_wait_ms must be positive"));
        }

        Ok(())
    }
}

#[track_caller]
fn validation(reason: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        location: ErrorLocation::from(Location::caller()),
        reason: reason.into(),
    }
}

/// `{config_dir}/edh-els`, the default location of `config.json`.
pub fn default_config_dir() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join(ELS_CLIENT_NAME))
        .ok_or_else(|| ConfigError::DirectoryNotFound {
            location: ErrorLocation::from(Location::caller()),
            reason: "no platform config directory".to_string(),
        })
}

/// `{data_local_dir}/edh-els/logs`, the default log directory.
pub fn default_log_dir() -> Result<PathBuf, ConfigError> {
    dirs::data_local_dir()
        .map(|dir| dir.join(ELS_CLIENT_NAME).join(LOG_DIR_NAME))
        .ok_or_else(|| ConfigError::DirectoryNotFound {
            location: ErrorLocation::from(Location::caller()),
            reason: "no platform data directory".to_string(),
        })
}
