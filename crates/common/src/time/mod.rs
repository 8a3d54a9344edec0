//! Time utilities and abstractions
//!
//! - **Clock abstractions**: real and mock wall-clock time for testing
//! - Small helpers for converting between `std` and `chrono` durations

pub mod clock;

pub use clock::{duration_until, to_chrono, Clock, MockClock, SharedClock, SystemClock};
