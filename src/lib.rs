//! # avr-isp
//!
//! In-system programming engine for AVR microcontrollers, as found in
//! USBasp-style programmers: it drives the target's RESET/SCK/MOSI/MISO
//! lines and implements the 4-byte serial programming protocol.
//!
//! ## Features
//!
//! - **Two transports**: hardware SPI for fast clocks, bit-banging for the
//!   slow ones, selected from a single speed ladder
//! - **Automatic fallback**: the programming-enable handshake steps down the
//!   ladder until the target answers
//! - **Extended addressing**: flash beyond 128K words, with the address
//!   window only reloaded when it changes
//! - **Data polling**: byte and page writes finish as soon as the target is
//!   done, bounded by a tick-based timeout
//!
//! ## Architecture
//!
//! The crate is structured to allow testing on desktop without hardware:
//!
//! - `traits` - Pin, SPI peripheral and clock abstractions
//! - `speed` - SCK tiers and the tier to transport mapping
//! - `transport` - Byte exchange over hardware SPI or bit-banged pins
//! - `session` - Link ownership, handshake and fallback
//! - `address` / `memory` / `block` - Memory operations
//! - `hal` - Mock clock and simulated target
//!
//! ## Example
//!
//! ```rust
//! use avr_isp::{IspConfig, IspSession, SckSpeed};
//! use avr_isp::hal::{FlashMode, MockClock, SimulatedTarget};
//!
//! let clock = MockClock::new();
//! let target = SimulatedTarget::new(clock.clone()).with_flash_mode(FlashMode::Byte);
//!
//! let config = IspConfig::default().with_speed(SckSpeed::Khz375);
//! let mut session = IspSession::connect(target, clock, config);
//! session.enter_programming_mode(false).unwrap();
//!
//! session.write_flash(0x0000, 0x0C, true).unwrap();
//! assert_eq!(session.read_flash(0x0000), 0x0C);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

extern crate alloc;

/// Extended address tracking for large flash.
pub mod address;
/// Block transfers and cross-block page accounting.
pub mod block;
/// Session and timing configuration.
pub mod config;
/// Error type and host status codes.
pub mod error;
/// Hardware abstraction layer with mock implementations for testing.
pub mod hal;
/// Flash, EEPROM and raw command operations.
pub mod memory;
/// Session lifecycle and programming-enable handshake.
pub mod session;
/// SCK speed tiers and hardware divider selection.
pub mod speed;
/// Core traits for hardware abstraction.
pub mod traits;
/// Byte transmission strategies.
pub mod transport;

// Re-exports for convenience
pub use address::ExtendedAddress;
pub use block::{BlockFlags, FlashBlockWriter};
pub use config::{IspConfig, TimingConfig};
pub use error::{status_of, IspError, Result, STATUS_FAILED, STATUS_OK};
pub use memory::{FLASH_BUSY, PAGE_BUSY};
pub use session::{IspSession, PROGRAMMING_ENABLE};
pub use speed::{SckSpeed, SpiClock, SpiDivider};
pub use traits::{Clock, IspLine, IspPins, SpiPeripheral};
pub use transport::Transport;
