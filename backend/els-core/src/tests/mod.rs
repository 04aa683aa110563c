mod config;
mod connect;
mod discovery;
mod output;
