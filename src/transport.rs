//! Transport Strategy: how one byte crosses the ISP link.
//!
//! Both variants are full duplex: while a byte is shifted out on MOSI,
//! one byte is sampled from MISO. Bits go MSB first in both directions.
//!
//! - [`Transport::Software`] bit-bangs SCK and MOSI through [`IspPins`],
//!   bounding each clock phase with a busy-wait on the [`Clock`].
//! - [`Transport::Hardware`] hands the byte to the [`SpiPeripheral`] shift
//!   register and spins on its completion flag.
//!
//! The variant is chosen by [`speed::configure`](crate::speed::configure)
//! and stored in the session; every byte exchange goes through
//! [`Transport::transmit`].

use crate::speed::SpiClock;
use crate::traits::{Clock, IspLine, IspPins, SpiPeripheral};

/// Active byte-transmission strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transport {
    /// Bit-banged transfer.
    Software {
        /// Busy-wait after each SCK edge, roughly half an SCK period.
        half_period_ticks: u16,
    },
    /// Transfer through the SPI peripheral.
    Hardware {
        /// Divider setting the peripheral is programmed with.
        clock: SpiClock,
    },
}

impl Transport {
    /// Returns true for the hardware variant.
    #[inline]
    pub const fn is_hardware(&self) -> bool {
        matches!(self, Transport::Hardware { .. })
    }

    /// Exchange one byte with the target.
    ///
    /// The hardware variant expects the peripheral to be enabled as clock
    /// master; it blocks until the peripheral reports completion.
    pub fn transmit<H, C>(&self, hw: &mut H, clock: &C, byte: u8) -> u8
    where
        H: IspPins + SpiPeripheral,
        C: Clock,
    {
        match *self {
            Transport::Software { half_period_ticks } => {
                transmit_bitbang(hw, clock, u32::from(half_period_ticks), byte)
            }
            Transport::Hardware { .. } => transmit_hw(hw, byte),
        }
    }
}

/// Bit-banged exchange (SPI mode 0, MSB first).
///
/// MOSI is set up and MISO sampled while SCK is low; the target latches
/// MOSI on the rising edge and shifts its next bit out on the falling edge.
fn transmit_bitbang<P, C>(pins: &mut P, clock: &C, half_period: u32, byte: u8) -> u8
where
    P: IspPins + ?Sized,
    C: Clock,
{
    let mut send = byte;
    let mut received = 0u8;

    for _ in 0..8 {
        pins.set_level(IspLine::Mosi, send & 0x80 != 0);
        send <<= 1;

        received <<= 1;
        if pins.read_miso() {
            received |= 1;
        }

        pins.set_level(IspLine::Sck, true);
        clock.delay_ticks(half_period);
        pins.set_level(IspLine::Sck, false);
        clock.delay_ticks(half_period);
    }

    received
}

fn transmit_hw<S: SpiPeripheral + ?Sized>(spi: &mut S, byte: u8) -> u8 {
    spi.start_transfer(byte);
    while !spi.transfer_complete() {}
    spi.read_data()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::{MockClock, SimulatedTarget};
    use crate::speed::{configure, SckSpeed};

    /// Target held in programming state with RESET low, ready to echo.
    fn ready_target() -> (SimulatedTarget, MockClock) {
        let clock = MockClock::new();
        let mut target = SimulatedTarget::new(clock.clone());
        for line in IspLine::ALL {
            target.set_output(line, true);
        }
        target.set_level(IspLine::Reset, true);
        target.set_level(IspLine::Reset, false);
        (target, clock)
    }

    fn enable_sequence(
        transport: Transport,
        target: &mut SimulatedTarget,
        clock: &MockClock,
    ) -> [u8; 4] {
        let mut echo = [0u8; 4];
        for (slot, byte) in echo.iter_mut().zip([0xAC, 0x53, 0x00, 0x00]) {
            *slot = transport.transmit(target, clock, byte);
        }
        echo
    }

    #[test]
    fn software_transfer_echoes_enable() {
        let (mut target, clock) = ready_target();
        let transport = configure(SckSpeed::Khz32);
        let echo = enable_sequence(transport, &mut target, &clock);
        assert_eq!(echo[2], 0x53);
        assert!(target.programming_enabled());
    }

    #[test]
    fn hardware_transfer_echoes_enable() {
        let (mut target, clock) = ready_target();
        let transport = configure(SckSpeed::Khz1500);
        if let Transport::Hardware { clock: spi_clock } = transport {
            target.set_clock(spi_clock);
        }
        target.enable_master();
        let echo = enable_sequence(transport, &mut target, &clock);
        assert_eq!(echo[2], 0x53);
    }

    #[test]
    fn software_transfer_clocks_eight_bits_per_byte() {
        let (mut target, clock) = ready_target();
        let transport = configure(SckSpeed::Khz16);
        transport.transmit(&mut target, &clock, 0xA5);
        assert_eq!(target.sck_rising_edges(), 8);
        // SCK idles low after the byte
        assert!(!target.level(IspLine::Sck));
    }

    #[test]
    fn software_delay_scales_transfer_time() {
        let (mut target, clock) = ready_target();
        let start = clock.peek();
        configure(SckSpeed::Khz32).transmit(&mut target, &clock, 0x00);
        let fast = clock.peek().wrapping_sub(start);

        let start = clock.peek();
        configure(SckSpeed::Khz4).transmit(&mut target, &clock, 0x00);
        let slow = clock.peek().wrapping_sub(start);

        assert!(fast >= 16 * 3);
        assert!(slow >= 16 * 24);
        assert!(slow > fast * 4);
    }

    #[test]
    fn is_hardware_matches_variant() {
        assert!(configure(SckSpeed::Mhz3).is_hardware());
        assert!(!configure(SckSpeed::Hz500).is_hardware());
    }
}
