//! Display/FromStr boilerplate for small string-backed enums
//!
//! Log levels and sync states are stored as text and shown to operators, so
//! each needs a stable lowercase spelling and case-insensitive parsing.
//!
//! # Example
//!
//! ```rust
//! use daosync_domain::impl_domain_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Phase {
//!     Idle,
//!     Running,
//! }
//!
//! impl_domain_status_conversions!(Phase {
//!     Idle => "idle",
//!     Running => "running",
//! });
//!
//! assert_eq!(Phase::Running.to_string(), "running");
//! assert_eq!("IDLE".parse::<Phase>(), Ok(Phase::Idle));
//! ```

/// Implements `Display` and `FromStr` for a fieldless enum
///
/// The string for every variant must be lowercase; parsing lowercases its
/// input before matching.
#[macro_export]
macro_rules! impl_domain_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:literal),+ $(,)? }) => {
        impl $enum_name {
            /// Stable lowercase spelling
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $str,)+
                }
            }
        }

        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
