pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod search;
pub mod storage;
pub mod test_utils;

pub use error::{ExoError, Result};

/// Package version from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
