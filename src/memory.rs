//! Memory Operation Engine: flash, EEPROM and raw commands.
//!
//! Flash addresses are *byte* addresses into program memory. Bit 0 picks the
//! low or high byte of the 16-bit word, bits 16..1 form the word address of
//! the command, and everything above is covered by the extended address
//! byte (see [`ExtendedAddress`](crate::ExtendedAddress)). EEPROM addresses
//! are plain byte addresses.
//!
//! | Operation | Byte 0 | Byte 1 | Byte 2 | Byte 3 |
//! |---|---|---|---|---|
//! | Load extended address | `0x4D` | `0x00` | high byte | `0x00` |
//! | Read flash low/high | `0x20`/`0x28` | addr\[16:9\] | addr\[8:1\] | read |
//! | Write flash low/high | `0x40`/`0x48` | addr\[16:9\] | addr\[8:1\] | data |
//! | Write page | `0x4C` | addr\[16:9\] | addr\[8:1\] | `0x00` |
//! | Read EEPROM | `0xA0` | addr\[15:8\] | addr\[7:0\] | read |
//! | Write EEPROM | `0xC0` | addr\[15:8\] | addr\[7:0\] | data |

use crate::error::{IspError, Result};
use crate::session::IspSession;
use crate::traits::{Clock, IspPins, SpiPeripheral};

/// Value read back from a flash byte while its write is in progress.
pub const FLASH_BUSY: u8 = 0x7F;

/// Value read back from a page while it is being programmed (and from
/// erased flash).
pub const PAGE_BUSY: u8 = 0xFF;

/// Opcodes of the serial programming instruction set.
pub mod opcode {
    /// Load extended address byte
    pub const LOAD_EXTENDED_ADDRESS: u8 = 0x4D;
    /// Read flash, low byte (OR [`HIGH_BYTE`] for the high byte)
    pub const READ_FLASH: u8 = 0x20;
    /// Write flash / load page buffer, low byte
    pub const WRITE_FLASH: u8 = 0x40;
    /// Commit the page buffer
    pub const WRITE_PAGE: u8 = 0x4C;
    /// Read EEPROM byte
    pub const READ_EEPROM: u8 = 0xA0;
    /// Write EEPROM byte
    pub const WRITE_EEPROM: u8 = 0xC0;
    /// Read signature byte
    pub const READ_SIGNATURE: u8 = 0x30;
    /// Programming enable / chip erase prefix
    pub const PROGRAMMING: u8 = 0xAC;
    /// Chip erase (second byte after [`PROGRAMMING`])
    pub const CHIP_ERASE: u8 = 0x80;
    /// Bit selecting the high byte of a flash word
    pub const HIGH_BYTE: u8 = 0x08;
}

/// Build a flash command for `address`.
///
/// The low bit of the byte address moves into bit 3 of the opcode.
#[inline]
fn flash_command(op: u8, address: u32, data: u8) -> [u8; 4] {
    let high_byte = if address & 1 != 0 { opcode::HIGH_BYTE } else { 0 };
    [op | high_byte, (address >> 9) as u8, (address >> 1) as u8, data]
}

#[inline]
fn eeprom_command(op: u8, address: u16, data: u8) -> [u8; 4] {
    let [high, low] = address.to_be_bytes();
    [op, high, low, data]
}

impl<H, C> IspSession<H, C>
where
    H: IspPins + SpiPeripheral,
    C: Clock,
{
    /// Load the extended address byte if `address` is in a different
    /// 128K-word window than the last access.
    pub fn ensure_extended_address(&mut self, address: u32) {
        if let Some(high) = self.extended.update(address) {
            log::trace!("extended address 0x{:02X}", high);
            self.send_command([opcode::LOAD_EXTENDED_ADDRESS, 0x00, high, 0x00]);
        }
    }

    /// Read one flash byte.
    pub fn read_flash(&mut self, address: u32) -> u8 {
        self.ensure_extended_address(address);
        self.send_command(flash_command(opcode::READ_FLASH, address, 0))[3]
    }

    /// Write one flash byte.
    ///
    /// For paged devices this only loads the page buffer; pass
    /// `poll = false` and follow up with [`flush_page`](Self::flush_page).
    /// With `poll`, completion is detected by reading the byte back until it
    /// no longer reads [`FLASH_BUSY`]. Writing `0x7F` itself cannot be
    /// polled, so that value gets the fixed worst-case wait instead.
    ///
    /// # Errors
    ///
    /// [`IspError::PollTimeout`] if the byte still reads busy after the
    /// polling budget, [`IspError::Disconnected`] after disconnect.
    pub fn write_flash(&mut self, address: u32, data: u8, poll: bool) -> Result<()> {
        self.ensure_connected()?;
        self.ensure_extended_address(address);
        self.send_command(flash_command(opcode::WRITE_FLASH, address, data));

        if !poll {
            return Ok(());
        }
        if data == FLASH_BUSY {
            self.wait_units(self.config.timing.write_wait_units);
            return Ok(());
        }
        self.poll_flash(address, FLASH_BUSY)
    }

    /// Commit the page buffer to the page containing `address`.
    ///
    /// `poll_value` is the last byte loaded into the page at `address`. If it
    /// is `0xFF` the page cannot be told apart from a busy page, so the fixed
    /// worst-case wait is used; otherwise `address` is polled until it stops
    /// reading [`PAGE_BUSY`].
    ///
    /// # Errors
    ///
    /// [`IspError::PollTimeout`] if the page still reads busy after the
    /// polling budget, [`IspError::Disconnected`] after disconnect.
    pub fn flush_page(&mut self, address: u32, poll_value: u8) -> Result<()> {
        self.ensure_connected()?;
        self.ensure_extended_address(address);
        self.send_command(flash_command(opcode::WRITE_PAGE, address, 0));

        if poll_value == PAGE_BUSY {
            self.wait_units(self.config.timing.write_wait_units);
            return Ok(());
        }
        self.poll_flash(address, PAGE_BUSY)
    }

    /// Read one EEPROM byte.
    pub fn read_eeprom(&mut self, address: u16) -> u8 {
        self.send_command(eeprom_command(opcode::READ_EEPROM, address, 0))[3]
    }

    /// Write one EEPROM byte and wait the fixed EEPROM write time.
    ///
    /// EEPROM writes are never data-polled; the only failure is
    /// [`IspError::Disconnected`].
    pub fn write_eeprom(&mut self, address: u16, data: u8) -> Result<()> {
        self.ensure_connected()?;
        self.send_command(eeprom_command(opcode::WRITE_EEPROM, address, data));
        self.wait_units(self.config.timing.eeprom_wait_units);
        Ok(())
    }

    /// Exchange a raw 4-byte instruction and return every byte received.
    ///
    /// Used by hosts for instructions the engine has no dedicated operation
    /// for (fuses, lock bits, calibration bytes).
    pub fn universal(&mut self, command: [u8; 4]) -> [u8; 4] {
        self.send_command(command)
    }

    /// Read the three device signature bytes.
    pub fn read_signature(&mut self) -> [u8; 3] {
        let mut signature = [0u8; 3];
        for (index, slot) in (0u8..).zip(signature.iter_mut()) {
            *slot = self.send_command([opcode::READ_SIGNATURE, 0x00, index, 0x00])[3];
        }
        signature
    }

    /// Erase flash and EEPROM, then wait the fixed erase time.
    ///
    /// The extended address cache is left alone.
    pub fn chip_erase(&mut self) -> Result<()> {
        self.ensure_connected()?;
        self.send_command([opcode::PROGRAMMING, opcode::CHIP_ERASE, 0x00, 0x00]);
        self.wait_units(self.config.timing.chip_erase_units);
        Ok(())
    }

    /// Data polling: re-read `address` until it stops reading `busy`.
    ///
    /// The budget is counted in windows, not reads: every time a full window
    /// passes without the byte changing, one retry is used up.
    fn poll_flash(&mut self, address: u32, busy: u8) -> Result<()> {
        let window = self.config.timing.poll_window_ticks();
        let mut retries = self.config.timing.poll_retries;
        let mut start = self.clock.now_ticks();

        while retries != 0 {
            if self.read_flash(address) != busy {
                return Ok(());
            }
            let now = self.clock.now_ticks();
            if now.wrapping_sub(start) > window {
                start = now;
                retries -= 1;
            }
        }

        log::warn!("flash at 0x{:06X} still busy after polling", address);
        Err(IspError::PollTimeout { address })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IspConfig;
    use crate::hal::{FlashMode, MockClock, SimulatedTarget};

    fn connected(
        target: SimulatedTarget,
        clock: MockClock,
    ) -> IspSession<SimulatedTarget, MockClock> {
        let mut session = IspSession::connect(target, clock, IspConfig::default());
        session.enter_programming_mode(false).unwrap();
        session.hardware_mut().clear_log();
        session
    }

    fn byte_mode() -> IspSession<SimulatedTarget, MockClock> {
        let clock = MockClock::new();
        let target = SimulatedTarget::new(clock.clone()).with_flash_mode(FlashMode::Byte);
        connected(target, clock)
    }

    fn paged() -> IspSession<SimulatedTarget, MockClock> {
        let clock = MockClock::new();
        let target = SimulatedTarget::new(clock.clone());
        connected(target, clock)
    }

    // =========================================================================
    // Command Encoding Tests
    // =========================================================================

    #[test]
    fn flash_command_splits_word_address() {
        assert_eq!(flash_command(0x20, 0x0_1234, 0), [0x20, 0x09, 0x1A, 0x00]);
        assert_eq!(flash_command(0x20, 0x0_1235, 0), [0x28, 0x09, 0x1A, 0x00]);
        assert_eq!(flash_command(0x40, 0x1_FFFF, 0xAB), [0x48, 0xFF, 0xFF, 0xAB]);
    }

    #[test]
    fn eeprom_command_is_big_endian() {
        assert_eq!(eeprom_command(0xA0, 0x0123, 0), [0xA0, 0x01, 0x23, 0x00]);
        assert_eq!(eeprom_command(0xC0, 0x0FFF, 0x5A), [0xC0, 0x0F, 0xFF, 0x5A]);
    }

    // =========================================================================
    // Flash Tests
    // =========================================================================

    #[test]
    fn read_flash_returns_stored_bytes() {
        let mut s = paged();
        s.hardware_mut().load_flash(0x100, &[0x12, 0x34]);
        assert_eq!(s.read_flash(0x100), 0x12);
        assert_eq!(s.read_flash(0x101), 0x34);
    }

    #[test]
    fn first_flash_access_loads_extended_address() {
        let mut s = paged();
        s.read_flash(0);
        assert_eq!(s.hardware().count_commands(opcode::LOAD_EXTENDED_ADDRESS), 1);
        s.read_flash(2);
        assert_eq!(s.hardware().count_commands(opcode::LOAD_EXTENDED_ADDRESS), 1);
    }

    #[test]
    fn byte_write_polls_until_ready() {
        let mut s = byte_mode();
        s.write_flash(0x40, 0x5A, true).unwrap();
        assert_eq!(s.hardware().flash()[0x40], 0x5A);
        assert!(s.hardware().count_commands(opcode::READ_FLASH) >= 1);
    }

    #[test]
    fn write_without_poll_returns_immediately() {
        let mut s = byte_mode();
        let start = s.clock().peek();
        s.write_flash(0x40, 0x5A, false).unwrap();
        assert_eq!(s.clock().peek(), start);
        assert_eq!(s.hardware().count_commands(opcode::READ_FLASH), 0);
    }

    #[test]
    fn writing_busy_value_uses_fixed_wait() {
        let mut s = byte_mode();
        let start = s.clock().peek();
        s.write_flash(0x40, FLASH_BUSY, true).unwrap();
        let elapsed = s.clock().peek().wrapping_sub(start);

        assert_eq!(s.hardware().count_commands(opcode::READ_FLASH), 0);
        assert_eq!(s.hardware().count_commands(opcode::READ_FLASH | opcode::HIGH_BYTE), 0);
        assert!(elapsed >= s.config().timing.unit_ticks(15));
    }

    #[test]
    fn stuck_write_times_out() {
        let clock = MockClock::new();
        let target = SimulatedTarget::new(clock.clone())
            .with_flash_mode(FlashMode::Byte)
            .with_stuck_busy(true);
        let mut s = connected(target, clock);

        assert_eq!(
            s.write_flash(0x10, 0x01, true),
            Err(IspError::PollTimeout { address: 0x10 })
        );
    }

    #[test]
    fn flush_commits_page() {
        let mut s = paged();
        for (i, byte) in [0xDE, 0xAD, 0xBE, 0xEF].into_iter().enumerate() {
            s.write_flash(0x200 + i as u32, byte, false).unwrap();
        }
        // not committed yet
        assert_eq!(s.hardware().flash()[0x200], 0xFF);

        s.flush_page(0x203, 0xEF).unwrap();
        assert_eq!(&s.hardware().flash()[0x200..0x204], &[0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(s.hardware().count_commands(opcode::WRITE_PAGE), 1);
    }

    #[test]
    fn flush_with_erased_value_waits_without_polling() {
        let mut s = paged();
        s.write_flash(0x200, 0xFF, false).unwrap();
        s.flush_page(0x200, PAGE_BUSY).unwrap();
        assert_eq!(s.hardware().count_commands(opcode::READ_FLASH), 0);
    }

    // =========================================================================
    // EEPROM / Raw Command Tests
    // =========================================================================

    #[test]
    fn eeprom_write_then_read() {
        let mut s = paged();
        let start = s.clock().peek();
        s.write_eeprom(0x0123, 0x42).unwrap();
        assert!(s.clock().peek().wrapping_sub(start) >= s.config().timing.unit_ticks(30));
        assert_eq!(s.read_eeprom(0x0123), 0x42);
        assert_eq!(s.hardware().eeprom()[0x0123], 0x42);
    }

    #[test]
    fn eeprom_access_never_loads_extended_address() {
        let mut s = paged();
        s.read_eeprom(0x0FFF);
        s.write_eeprom(0x0FFF, 1).unwrap();
        assert_eq!(s.hardware().count_commands(opcode::LOAD_EXTENDED_ADDRESS), 0);
    }

    #[test]
    fn universal_returns_all_echo_bytes() {
        let mut s = paged();
        let echo = s.universal([0x30, 0x00, 0x00, 0x00]);
        assert_eq!(echo[1], 0x30);
        assert_eq!(echo[2], 0x00);
        assert_eq!(echo[3], 0x1E);
    }

    #[test]
    fn signature_bytes() {
        let mut s = paged();
        assert_eq!(s.read_signature(), [0x1E, 0x98, 0x01]);
    }

    #[test]
    fn chip_erase_clears_memories() {
        let mut s = paged();
        s.hardware_mut().load_flash(0, &[0x00; 16]);
        s.write_eeprom(0, 0x00).unwrap();
        s.read_flash(0);

        s.chip_erase().unwrap();
        assert!(s.hardware().flash()[..16].iter().all(|&b| b == 0xFF));
        assert_eq!(s.hardware().eeprom()[0], 0xFF);
        assert_eq!(s.extended.cached(), Some(0));
    }

    #[test]
    fn writes_after_disconnect_are_rejected() {
        let mut s = byte_mode();
        s.disconnect();
        s.hardware_mut().clear_log();

        assert_eq!(s.write_flash(0x10, 0x01, true), Err(IspError::Disconnected));
        assert_eq!(s.flush_page(0x10, 0x01), Err(IspError::Disconnected));
        assert_eq!(s.write_eeprom(0x10, 0x01), Err(IspError::Disconnected));
        assert_eq!(s.chip_erase(), Err(IspError::Disconnected));
        assert!(s.hardware().commands().is_empty());
        assert_eq!(s.hardware().flash()[0x10], 0xFF);
    }

    #[test]
    fn reads_after_disconnect_return_idle_bus() {
        let mut s = byte_mode();
        s.hardware_mut().load_flash(0, &[0x12]);
        s.disconnect();

        assert_eq!(s.read_flash(0), 0xFF);
        assert_eq!(s.read_eeprom(0), 0xFF);
        assert_eq!(s.read_signature(), [0xFF; 3]);
        assert_eq!(s.universal([0x30, 0x00, 0x00, 0x00]), [0xFF; 4]);
        assert!(!s.hardware().spi_enabled());
    }
}
