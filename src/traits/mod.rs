//! Trait definitions for the platform collaborators of the ISP engine.
//!
//! The engine never touches registers directly. It is generic over:
//!
//! - [`IspPins`]: the RESET/SCK/MOSI control lines and the MISO input
//! - [`SpiPeripheral`]: the optional hardware shift register
//! - [`Clock`]: the free-running tick counter used for every delay
//!
//! A single hardware type usually implements both [`IspPins`] and
//! [`SpiPeripheral`], since they share the same port pins.

pub mod hardware;

pub use hardware::*;
