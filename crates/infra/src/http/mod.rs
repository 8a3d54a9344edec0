//! Retrying HTTP transport shared by remote API clients

pub mod client;
pub mod rate_limit;

pub use client::{HttpClient, HttpClientBuilder};
pub use rate_limit::parse_rate_limit;
