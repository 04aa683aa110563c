//! Command line of the `edh-els` binary.

use crate::error::ElsClientError;
use crate::logger::level_for;

use els_core::config::{ClientConfig, default_config_dir, default_log_dir};

use std::env::current_dir;
use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;

#[derive(Parser, Debug)]
#[command(name = "edh-els")]
#[command(about = "Connects an editor to the Edh language server, launching it when needed")]
#[command(version)]
pub struct Cli {
    /// Workspace the server is queried and launched in [default: current directory]
    #[arg(long, env = "EDH_ELS_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    /// Directory holding config.json
    #[arg(long)]
    pub config_dir: Option<PathBuf>,

    /// Directory for the client and server log files
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Launch the server in debug mode
    #[arg(long)]
    pub debug: bool,

    /// Never launch a server, only wait for one to appear
    #[arg(long)]
    pub no_launch: bool,

    /// Log at trace level
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    #[track_caller]
    pub fn workspace_dir(&self) -> Result<PathBuf, ElsClientError> {
        match &self.workspace {
            Some(dir) => Ok(dir.clone()),
            None => current_dir().map_err(|e| {
                ElsClientError::client(format!("Failed to get current directory: {e}"))
            }),
        }
    }

    #[track_caller]
    pub fn config_dir(&self) -> Result<PathBuf, ElsClientError> {
        match &self.config_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(default_config_dir()?),
        }
    }

    #[track_caller]
    pub fn log_dir(&self) -> Result<PathBuf, ElsClientError> {
        match &self.log_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(default_log_dir()?),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        level_for(self.verbose)
    }

    /// Read config.json once; the CLI switches can only turn modes on.
    pub fn load_config(&self) -> Result<ClientConfig, ElsClientError> {
        let mut config = ClientConfig::load(&self.config_dir()?)?;
        self.apply_overrides(&mut config);
        Ok(config)
    }

    /// Fold the flags into `config` and claim stdin for the bridge.
    pub fn apply_overrides(&self, config: &mut ClientConfig) {
        config.debug |= self.debug;
        config.no_launch |= self.no_launch;
        config.launch.inherit_stdin = false;
    }
}
