//! Hardware Abstraction Layer implementations.
//!
//! Concrete implementations of the traits defined in [`crate::traits`].
//! Firmware provides its own register-level implementations; this crate
//! ships the desktop ones.
//!
//! # Available Implementations
//!
//! - `mock`: shared tick counter and a simulated AVR target for tests and
//!   the `isp-sim` demo

pub mod mock;

pub use mock::*;
