pub mod config;
pub mod connect;
pub mod discovery;
pub mod error;
pub mod output;
pub mod session;

#[cfg(test)]
mod tests;

pub const ELS_CLIENT_NAME: &str = "edh-els";
pub const ELS_SERVER_HOSTNAME: &str = "localhost";
pub const ELS_SERVER_LOG_FILE: &str = const_format::concatcp!(ELS_CLIENT_NAME, "-server.log");
