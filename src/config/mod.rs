// src/config/mod.rs

//! Driver configuration (`Execdriver.toml`).
//!
//! - [`model`] holds the serde types.
//! - [`loader`] reads TOML from disk.
//! - [`validate`] turns a [`RawConfigFile`] into a checked [`ConfigFile`].

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{ConfigFile, EnvironmentConfig, RawConfigFile};
