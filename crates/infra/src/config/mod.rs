//! Configuration loading
//!
//! Builds a validated `daosync_domain::Config` from a config file and
//! environment variables.

pub mod loader;

pub use loader::{apply_env_overrides, load, load_from_file, probe_config_paths};
