//! Core traits for platform-agnostic scheduling.
//!
//! # Design
//!
//! - Trait definitions are pure and have no feature gates
//! - Mock implementations are always available for host testing
//! - The wall-clock implementation is only compiled with `std`

pub mod time;

#[cfg(feature = "std")]
pub use time::StdTime;
pub use time::{MockTime, TimeSource};
