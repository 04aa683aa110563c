mod connect;
mod discovery;
mod error;
mod helpers;
