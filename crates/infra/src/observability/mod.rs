//! Structured logging setup
//!
//! Everything logs through `tracing`; this module only installs the
//! subscriber. The persisted, operator-facing record of sync runs lives in
//! the core sync log.

pub mod logging;

pub use logging::init_tracing;
