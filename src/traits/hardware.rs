//! Hardware abstraction traits for the ISP link.
//!
//! This module defines the collaborator contracts the engine needs from the
//! host platform. Everything the engine touches on the wire goes through
//! these traits, so the whole engine can be exercised on the desktop against
//! [`crate::hal::SimulatedTarget`].
//!
//! # Key Traits
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`IspPins`] | RESET/SCK/MOSI control lines and the MISO input |
//! | [`SpiPeripheral`] | Hardware shift register (clock master) |
//! | [`Clock`] | Free-running tick counter for delays and timeouts |
//!
//! # Example
//!
//! ```rust
//! use avr_isp::traits::{Clock, IspLine, IspPins};
//! use avr_isp::hal::{MockClock, SimulatedTarget};
//!
//! let clock = MockClock::new();
//! let mut target = SimulatedTarget::new(clock.clone());
//!
//! target.set_output(IspLine::Sck, true);
//! assert!(target.is_output(IspLine::Sck));
//! assert!(!target.level(IspLine::Sck));
//! ```

use crate::speed::SpiClock;

/// One of the three control lines driven by the programmer.
///
/// MISO is not listed here: it is always an input on the programmer side
/// and is read through [`IspPins::read_miso`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IspLine {
    /// Target RESET line (active low on the target).
    Reset,
    /// Serial clock.
    Sck,
    /// Programmer-to-target data.
    Mosi,
}

impl IspLine {
    /// All control lines, in the order they are switched on connect.
    pub const ALL: [IspLine; 3] = [IspLine::Sck, IspLine::Mosi, IspLine::Reset];

    /// Returns the conventional signal name.
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            IspLine::Reset => "RST",
            IspLine::Sck => "SCK",
            IspLine::Mosi => "MOSI",
        }
    }
}

/// Control-line access for the ISP connector.
///
/// Every method switches exactly one line. On platforms where other logic
/// (for example a USB stack) shares the port register, implementations must
/// make each call atomic with respect to that logic.
///
/// An input line with its level set high has its pull-up enabled on AVR
/// style ports; the engine clears levels when releasing the link so no
/// pull-ups remain.
pub trait IspPins {
    /// Switch a control line between output (`true`) and input (`false`).
    fn set_output(&mut self, line: IspLine, output: bool);

    /// Drive a control line high or low.
    fn set_level(&mut self, line: IspLine, high: bool);

    /// Enable or disable the pull-up on the MISO input.
    fn set_miso_pullup(&mut self, enabled: bool);

    /// Sample the MISO input.
    fn read_miso(&self) -> bool;
}

/// Hardware SPI shift register used as clock master.
///
/// The engine owns the enable state: it enables the peripheral only while
/// the hardware transport is selected and disables it whenever the software
/// transport takes over or the link is released, so the peripheral never
/// fights the bit-banged lines.
pub trait SpiPeripheral {
    /// Program clock divider and double-speed mode.
    ///
    /// Called with the peripheral disabled.
    fn set_clock(&mut self, clock: SpiClock);

    /// Enable the peripheral as clock master.
    fn enable_master(&mut self);

    /// Disable the peripheral and return its pins to plain port control.
    ///
    /// Must be harmless when the peripheral is already disabled.
    fn disable(&mut self);

    /// Load a byte into the shift register and start clocking it out.
    fn start_transfer(&mut self, byte: u8);

    /// Returns true once the transfer started by
    /// [`start_transfer`](Self::start_transfer) has finished.
    fn transfer_complete(&self) -> bool;

    /// Read the byte shifted in during the last transfer.
    fn read_data(&mut self) -> u8;
}

/// Free-running tick counter.
///
/// The counter is allowed to wrap; the engine only ever looks at
/// `now.wrapping_sub(start)`. The tick rate is described by
/// [`TimingConfig`](crate::config::TimingConfig).
pub trait Clock {
    /// Returns the current counter value.
    fn now_ticks(&self) -> u32;

    /// Ticks elapsed since `start`, wraparound-safe.
    #[inline]
    fn elapsed_since(&self, start: u32) -> u32 {
        self.now_ticks().wrapping_sub(start)
    }

    /// Busy-wait until at least `ticks` ticks have elapsed.
    fn delay_ticks(&self, ticks: u32) {
        let start = self.now_ticks();
        while self.elapsed_since(start) < ticks {}
    }
}
