//! Block transfers built on the single-byte memory operations.
//!
//! Hosts move memory in blocks of up to a few hundred bytes. Reads and
//! EEPROM writes are plain loops; flash writes additionally have to track
//! how far the current page buffer is filled across blocks, which is what
//! [`FlashBlockWriter`] does.
//!
//! # Example
//!
//! ```rust
//! use avr_isp::{BlockFlags, FlashBlockWriter, IspConfig, IspSession};
//! use avr_isp::hal::{MockClock, SimulatedTarget};
//!
//! let clock = MockClock::new();
//! let target = SimulatedTarget::new(clock.clone()); // 128-word pages
//! let mut session = IspSession::connect(target, clock, IspConfig::default());
//! session.enter_programming_mode(false).unwrap();
//!
//! let mut writer = FlashBlockWriter::new(0x0000, 256);
//! let image = [0x0C, 0x94, 0x5C, 0x00];
//! session.write_flash_block(&mut writer, &image, BlockFlags::single()).unwrap();
//!
//! let mut readback = [0u8; 4];
//! session.read_flash_block(0x0000, &mut readback);
//! assert_eq!(readback, [0x0C, 0x94, 0x5C, 0x00]);
//! ```

use crate::error::Result;
use crate::session::IspSession;
use crate::traits::{Clock, IspPins, SpiPeripheral};

/// Position of a block within a multi-block transfer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BlockFlags {
    /// First block: restart page accounting.
    pub first: bool,
    /// Last block: flush any partially filled page.
    pub last: bool,
}

impl BlockFlags {
    /// A transfer consisting of exactly one block.
    pub const fn single() -> Self {
        Self {
            first: true,
            last: true,
        }
    }

    /// Decode the host's flag byte (bit 0 = first, bit 1 = last).
    pub const fn from_bits(bits: u8) -> Self {
        Self {
            first: bits & 0x01 != 0,
            last: bits & 0x02 != 0,
        }
    }
}

/// Flash write cursor that survives across blocks.
///
/// `page_size` is in bytes. A page size of 0 means the device programs
/// byte by byte, and every byte is data-polled on its own.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlashBlockWriter {
    address: u32,
    page_size: u16,
    page_remaining: u16,
    last_byte: u8,
}

impl FlashBlockWriter {
    /// Start writing at byte `address`.
    pub const fn new(address: u32, page_size: u16) -> Self {
        Self {
            address,
            page_size,
            page_remaining: page_size,
            last_byte: 0xFF,
        }
    }

    /// Next byte address to be written.
    pub const fn address(&self) -> u32 {
        self.address
    }

    /// Returns true if bytes are sitting in the page buffer unflushed.
    pub const fn page_pending(&self) -> bool {
        self.page_size != 0 && self.page_remaining != self.page_size
    }
}

impl<H, C> IspSession<H, C>
where
    H: IspPins + SpiPeripheral,
    C: Clock,
{
    /// Read consecutive flash bytes starting at `address`.
    pub fn read_flash_block(&mut self, address: u32, buf: &mut [u8]) {
        for (addr, byte) in (address..).zip(buf.iter_mut()) {
            *byte = self.read_flash(addr);
        }
    }

    /// Read consecutive EEPROM bytes starting at `address`.
    pub fn read_eeprom_block(&mut self, address: u16, buf: &mut [u8]) {
        let mut addr = address;
        for byte in buf.iter_mut() {
            *byte = self.read_eeprom(addr);
            addr = addr.wrapping_add(1);
        }
    }

    /// Write consecutive EEPROM bytes starting at `address`.
    pub fn write_eeprom_block(&mut self, address: u16, data: &[u8]) -> Result<()> {
        let mut addr = address;
        for &byte in data {
            self.write_eeprom(addr, byte)?;
            addr = addr.wrapping_add(1);
        }
        Ok(())
    }

    /// Write a block of flash through `writer`.
    ///
    /// Paged devices get each page flushed as soon as its last byte is
    /// loaded, polled on that byte. With `flags.last` a partially filled
    /// page is flushed at the end of the block.
    ///
    /// # Errors
    ///
    /// The first [`PollTimeout`](crate::IspError::PollTimeout) stops the
    /// block; the writer is left at the failing byte.
    pub fn write_flash_block(
        &mut self,
        writer: &mut FlashBlockWriter,
        data: &[u8],
        flags: BlockFlags,
    ) -> Result<()> {
        if flags.first {
            writer.page_remaining = writer.page_size;
        }

        for &byte in data {
            let address = writer.address;
            if writer.page_size == 0 {
                self.write_flash(address, byte, true)?;
            } else {
                self.write_flash(address, byte, false)?;
                writer.page_remaining -= 1;
                if writer.page_remaining == 0 {
                    self.flush_page(address, byte)?;
                    writer.page_remaining = writer.page_size;
                }
            }
            writer.last_byte = byte;
            writer.address = address.wrapping_add(1);
        }

        if flags.last && writer.page_pending() {
            self.flush_page(writer.address.wrapping_sub(1), writer.last_byte)?;
            writer.page_remaining = writer.page_size;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IspConfig;
    use crate::hal::{FlashMode, MockClock, SimulatedTarget};
    use crate::memory::opcode;

    fn session(mode: FlashMode) -> IspSession<SimulatedTarget, MockClock> {
        let clock = MockClock::new();
        let target = SimulatedTarget::new(clock.clone()).with_flash_mode(mode);
        let mut session = IspSession::connect(target, clock, IspConfig::default());
        session.enter_programming_mode(false).unwrap();
        session.hardware_mut().clear_log();
        session
    }

    #[test]
    fn flags_from_bits() {
        assert_eq!(BlockFlags::from_bits(0), BlockFlags::default());
        assert_eq!(BlockFlags::from_bits(3), BlockFlags::single());
        assert!(BlockFlags::from_bits(2).last);
        assert!(!BlockFlags::from_bits(2).first);
    }

    #[test]
    fn full_pages_flush_as_they_fill() {
        let mut s = session(FlashMode::Paged { page_words: 4 });
        let data: Vec<u8> = (0u8..16).collect();
        let mut writer = FlashBlockWriter::new(0, 8);

        s.write_flash_block(&mut writer, &data, BlockFlags::single()).unwrap();

        assert_eq!(s.hardware().count_commands(opcode::WRITE_PAGE), 2);
        assert_eq!(&s.hardware().flash()[..16], data.as_slice());
        assert_eq!(writer.address(), 16);
        assert!(!writer.page_pending());
    }

    #[test]
    fn partial_page_flushed_only_on_last_block() {
        let mut s = session(FlashMode::Paged { page_words: 4 });
        let mut writer = FlashBlockWriter::new(0, 8);

        let first = BlockFlags { first: true, last: false };
        s.write_flash_block(&mut writer, &[1, 2, 3], first).unwrap();
        assert_eq!(s.hardware().count_commands(opcode::WRITE_PAGE), 0);
        assert!(writer.page_pending());

        let last = BlockFlags { first: false, last: true };
        s.write_flash_block(&mut writer, &[4, 5], last).unwrap();
        assert_eq!(s.hardware().count_commands(opcode::WRITE_PAGE), 1);
        assert_eq!(&s.hardware().flash()[..5], &[1, 2, 3, 4, 5]);
    }

    #[test]
    fn unpaged_writes_poll_each_byte() {
        let mut s = session(FlashMode::Byte);
        let mut writer = FlashBlockWriter::new(0x80, 0);
        s.write_flash_block(&mut writer, &[0x11, 0x22, 0x33], BlockFlags::single())
            .unwrap();

        assert_eq!(&s.hardware().flash()[0x80..0x83], &[0x11, 0x22, 0x33]);
        assert_eq!(s.hardware().count_commands(opcode::WRITE_PAGE), 0);
        assert!(!writer.page_pending());
    }

    #[test]
    fn eeprom_block_round_trip() {
        let mut s = session(FlashMode::Byte);
        s.write_eeprom_block(0x10, &[9, 8, 7]).unwrap();
        let mut buf = [0u8; 3];
        s.read_eeprom_block(0x10, &mut buf);
        assert_eq!(buf, [9, 8, 7]);
    }

    #[test]
    fn empty_last_block_flushes_pending_page() {
        let mut s = session(FlashMode::Paged { page_words: 4 });
        let mut writer = FlashBlockWriter::new(0, 8);
        let first = BlockFlags { first: true, last: false };
        s.write_flash_block(&mut writer, &[0x31, 0x32], first).unwrap();

        let last = BlockFlags { first: false, last: true };
        s.write_flash_block(&mut writer, &[], last).unwrap();
        assert_eq!(s.hardware().count_commands(opcode::WRITE_PAGE), 1);
        assert_eq!(&s.hardware().flash()[..2], &[0x31, 0x32]);
    }

    #[test]
    fn empty_last_block_with_nothing_pending() {
        let mut s = session(FlashMode::Paged { page_words: 4 });
        let mut writer = FlashBlockWriter::new(0, 8);
        s.write_flash_block(&mut writer, &[], BlockFlags::single()).unwrap();
        assert_eq!(s.hardware().count_commands(opcode::WRITE_PAGE), 0);
    }
}
