//! Configuration module for sheetsmith
//!
//! Provides types, discovery and parsing for `sheetsmith.toml`.

pub mod loader;
pub mod schema;

pub use loader::{find_config, load_config, merge_cli_overrides, CliOverrides, ConfigError};
pub use schema::*;
