//! Database implementations

pub mod account_repository;
pub mod manager;
pub mod post_repository;
pub mod sync_log_repository;

pub use account_repository::*;
pub use manager::*;
pub use post_repository::*;
pub use sync_log_repository::*;
