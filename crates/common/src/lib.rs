//! Common utilities shared across DaoSync crates.
//!
//! # Modules
//! - [`time`]: wall-clock abstraction (`Clock`, `SystemClock`, `MockClock`)
//! - [`resilience`]: request budgeting against remote rate-limit windows
//!
//! Nothing in here knows about posts, accounts or sync runs; domain types
//! live in `daosync-domain`.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod resilience;
pub mod time;

pub use resilience::{RateBudget, RateBudgetConfig, RateUsage, RateWindow, Reservation};
pub use time::{Clock, MockClock, SharedClock, SystemClock};
