// Library exports for testing
// The binary (main.rs) imports these as well

pub mod bridge;
pub mod cli;
pub mod error;
pub mod lifecycle;
pub mod logger;

#[cfg(test)]
mod tests;
