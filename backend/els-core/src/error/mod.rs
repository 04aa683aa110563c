pub mod config;
pub mod connect;
pub mod establish;
pub mod launch;
pub mod query;

pub use config::ConfigError;
pub use connect::ConnectError;
pub use establish::EstablishError;
pub use launch::LaunchError;
pub use query::ConfigQueryError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Establish(#[from] establish::EstablishError),
}
