//! Mock implementations for testing without hardware.
//!
//! This module provides test doubles for the hardware traits, so the whole
//! engine (handshake, fallback ladder, data polling) can be exercised on the
//! desktop.
//!
//! # Available Mocks
//!
//! | Mock | Trait | Purpose |
//! |------|-------|---------|
//! | [`MockClock`] | [`Clock`] | Shared, auto-advancing tick counter |
//! | [`SimulatedTarget`] | [`IspPins`] + [`SpiPeripheral`] | AVR in serial programming mode |
//!
//! # Example
//!
//! ```rust
//! use avr_isp::hal::{MockClock, SimulatedTarget};
//! use avr_isp::traits::Clock;
//!
//! let clock = MockClock::new();
//! let target = SimulatedTarget::new(clock.clone());
//!
//! // every read advances the shared counter by one tick
//! assert_eq!(clock.now_ticks(), 0);
//! assert_eq!(clock.now_ticks(), 1);
//! assert_eq!(clock.peek(), 2);
//! assert!(!target.programming_enabled());
//! ```
//!
//! [`Clock`]: crate::traits::Clock
//! [`IspPins`]: crate::traits::IspPins
//! [`SpiPeripheral`]: crate::traits::SpiPeripheral

use alloc::rc::Rc;
use alloc::vec;
use alloc::vec::Vec;
use core::cell::Cell;

use crate::speed::SpiClock;
use crate::traits::{Clock, IspLine, IspPins, SpiPeripheral};

// ============================================================================
// Clock
// ============================================================================

/// Mock tick counter for testing.
///
/// Clones share the same counter, so a [`SimulatedTarget`] can look at the
/// time the engine sees. Every [`now_ticks`](Clock::now_ticks) call advances
/// the counter by `step` ticks, which lets busy-wait loops terminate.
///
/// # Example
///
/// ```rust
/// use avr_isp::hal::MockClock;
/// use avr_isp::traits::Clock;
///
/// let clock = MockClock::starting_at(u32::MAX).with_step(0);
/// assert_eq!(clock.now_ticks(), u32::MAX);
///
/// clock.advance(2);
/// assert_eq!(clock.now_ticks(), 1);
///
/// clock.set(1000);
/// assert_eq!(clock.peek(), 1000);
/// ```
#[derive(Clone, Debug)]
pub struct MockClock {
    ticks: Rc<Cell<u32>>,
    step: u32,
}

impl MockClock {
    /// Creates a new mock clock at tick 0, advancing one tick per read.
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Creates a mock clock starting at the given tick.
    pub fn starting_at(ticks: u32) -> Self {
        Self {
            ticks: Rc::new(Cell::new(ticks)),
            step: 1,
        }
    }

    /// Sets how far each read advances the counter (0 = frozen).
    pub fn with_step(mut self, step: u32) -> Self {
        self.step = step;
        self
    }

    /// Sets the current tick.
    pub fn set(&self, ticks: u32) {
        self.ticks.set(ticks);
    }

    /// Advances the counter, wrapping like the hardware counter.
    pub fn advance(&self, ticks: u32) {
        self.ticks.set(self.ticks.get().wrapping_add(ticks));
    }

    /// Current tick, without advancing.
    pub fn peek(&self) -> u32 {
        self.ticks.get()
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now_ticks(&self) -> u32 {
        let now = self.ticks.get();
        self.ticks.set(now.wrapping_add(self.step));
        now
    }
}

// ============================================================================
// Simulated Target
// ============================================================================

/// Programmer clock cycles per tick (12 MHz, prescaler 64).
///
/// Used to compare bit-banged SCK periods against hardware divide ratios.
pub const CYCLES_PER_TICK: u32 = 64;

/// How the simulated device programs its flash.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlashMode {
    /// Every write command programs one byte and is data-polled on 0x7F.
    Byte,
    /// Write commands fill a page buffer, committed by the write-page command.
    Paged {
        /// Page size in 16-bit words
        page_words: u16,
    },
}

#[derive(Clone, Copy, Debug)]
struct BusyWindow {
    start: u32,
    ticks: u32,
    first: usize,
    end: usize,
    value: u8,
}

/// Simulated AVR target behind a simulated programmer port.
///
/// Implements both [`IspPins`] and [`SpiPeripheral`], like a real
/// programmer whose SPI peripheral shares the ISP pins. The target side
/// models:
///
/// - RESET: the target listens only while RESET is driven low; a RESET
///   pulse drops programming mode and restarts byte framing
/// - bit-level SPI mode 0 (MOSI latched on SCK rise, MISO shifted on fall)
///   and whole-byte transfers through the shift register
/// - a minimum tolerated SCK period; faster bytes are lost and MISO floats
///   high
/// - the echo protocol, flash (byte or paged), EEPROM, signature, chip
///   erase and data-polling busy windows
/// - a log of every complete 4-byte command
///
/// # Example
///
/// ```rust
/// use avr_isp::hal::{FlashMode, MockClock, SimulatedTarget};
///
/// let clock = MockClock::new();
/// let target = SimulatedTarget::new(clock.clone())
///     .with_flash_mode(FlashMode::Byte)
///     .with_min_sck_period_cycles(20_000); // only answers very slow SCK
///
/// assert_eq!(target.flash().len(), 256 * 1024);
/// ```
#[derive(Debug)]
pub struct SimulatedTarget {
    clock: MockClock,

    // Programmer port
    outputs: [bool; 3],
    levels: [bool; 3],
    miso_pullup: bool,

    // SPI peripheral
    spi_clock: Option<SpiClock>,
    spi_enabled: bool,
    spi_enable_count: usize,
    spi_data: u8,
    spi_complete: bool,

    // Target serial interface
    listening: bool,
    programming: bool,
    shift_in: u8,
    shift_out: u8,
    bit_count: u8,
    last_rise: Option<u32>,
    too_fast: bool,
    sck_rises: usize,
    frame: heapless::Vec<u8, 4>,
    min_sck_period_cycles: u32,

    // Memories
    flash: Vec<u8>,
    eeprom: Vec<u8>,
    signature: [u8; 3],
    flash_mode: FlashMode,
    page_buffer: Vec<Option<u8>>,
    extended: u8,
    busy: Option<BusyWindow>,
    write_busy_ticks: u32,
    stuck_busy: bool,
    enables_to_ignore: u32,
    reset_pulses: usize,

    log: Vec<[u8; 4]>,
}

impl SimulatedTarget {
    /// Creates an erased ATmega2560-like target (256 KiB flash with
    /// 128-word pages, 4 KiB EEPROM) that accepts any SCK speed.
    pub fn new(clock: MockClock) -> Self {
        let flash_mode = FlashMode::Paged { page_words: 128 };
        Self {
            clock,
            outputs: [false; 3],
            levels: [false; 3],
            miso_pullup: false,
            spi_clock: None,
            spi_enabled: false,
            spi_enable_count: 0,
            spi_data: 0xFF,
            spi_complete: false,
            listening: false,
            programming: false,
            shift_in: 0,
            shift_out: 0xFF,
            bit_count: 0,
            last_rise: None,
            too_fast: false,
            sck_rises: 0,
            frame: heapless::Vec::new(),
            min_sck_period_cycles: 0,
            flash: vec![0xFF; 256 * 1024],
            eeprom: vec![0xFF; 4 * 1024],
            signature: [0x1E, 0x98, 0x01],
            flash_mode,
            page_buffer: vec![None; page_bytes(flash_mode)],
            extended: 0,
            busy: None,
            write_busy_ticks: 200,
            stuck_busy: false,
            enables_to_ignore: 0,
            reset_pulses: 0,
            log: Vec::new(),
        }
    }

    /// Sets the flash programming mode.
    pub fn with_flash_mode(mut self, mode: FlashMode) -> Self {
        self.flash_mode = mode;
        self.page_buffer = vec![None; page_bytes(mode)];
        self
    }

    /// Resizes flash (bytes), erased.
    pub fn with_flash_size(mut self, bytes: usize) -> Self {
        self.flash = vec![0xFF; bytes.max(2)];
        self
    }

    /// Resizes EEPROM (bytes), erased.
    pub fn with_eeprom_size(mut self, bytes: usize) -> Self {
        self.eeprom = vec![0xFF; bytes.max(1)];
        self
    }

    /// Sets the signature bytes.
    pub fn with_signature(mut self, signature: [u8; 3]) -> Self {
        self.signature = signature;
        self
    }

    /// Shortest SCK period the target can follow, in programmer cycles.
    ///
    /// Hardware transfers have a period of the divide ratio; bit-banged
    /// transfers are measured on the shared clock.
    pub fn with_min_sck_period_cycles(mut self, cycles: u32) -> Self {
        self.min_sck_period_cycles = cycles;
        self
    }

    /// Changes the tolerated SCK period of a live target.
    pub fn set_min_sck_period_cycles(&mut self, cycles: u32) {
        self.min_sck_period_cycles = cycles;
    }

    /// A target that never answers, at any speed.
    pub fn unresponsive(self) -> Self {
        self.with_min_sck_period_cycles(u32::MAX)
    }

    /// How long a byte write or page commit keeps reading busy.
    pub fn with_write_busy_ticks(mut self, ticks: u32) -> Self {
        self.write_busy_ticks = ticks;
        self
    }

    /// Answers programming enable only after ignoring `count` attempts.
    pub fn with_ignored_enables(mut self, count: u32) -> Self {
        self.enables_to_ignore = count;
        self
    }

    /// Writes never finish: polled locations read busy forever.
    pub fn with_stuck_busy(mut self, stuck: bool) -> Self {
        self.stuck_busy = stuck;
        self
    }

    /// Preloads flash contents at a byte address.
    pub fn load_flash(&mut self, address: usize, data: &[u8]) {
        let len = self.flash.len();
        for (i, &byte) in data.iter().enumerate() {
            self.flash[(address + i) % len] = byte;
        }
    }

    /// Flash contents.
    pub fn flash(&self) -> &[u8] {
        &self.flash
    }

    /// EEPROM contents.
    pub fn eeprom(&self) -> &[u8] {
        &self.eeprom
    }

    /// Every complete 4-byte command seen, oldest first.
    pub fn commands(&self) -> &[[u8; 4]] {
        &self.log
    }

    /// Number of logged commands whose first byte is `opcode`.
    pub fn count_commands(&self, opcode: u8) -> usize {
        self.log.iter().filter(|cmd| cmd[0] == opcode).count()
    }

    /// Clears the command log.
    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    /// Last extended address byte loaded.
    pub fn extended_address(&self) -> u8 {
        self.extended
    }

    /// Returns true once programming enable has been accepted.
    pub fn programming_enabled(&self) -> bool {
        self.programming
    }

    /// Returns true if the programmer drives the line.
    pub fn is_output(&self, line: IspLine) -> bool {
        self.outputs[line_index(line)]
    }

    /// Level last written to the line.
    pub fn level(&self, line: IspLine) -> bool {
        self.levels[line_index(line)]
    }

    /// Returns true if the MISO pull-up is on.
    pub fn miso_pullup(&self) -> bool {
        self.miso_pullup
    }

    /// Returns true while the SPI peripheral is enabled.
    pub fn spi_enabled(&self) -> bool {
        self.spi_enabled
    }

    /// Number of times the peripheral has been enabled.
    pub fn spi_enable_count(&self) -> usize {
        self.spi_enable_count
    }

    /// Clock setting last programmed into the peripheral.
    pub fn spi_clock(&self) -> Option<SpiClock> {
        self.spi_clock
    }

    /// RESET pulses seen, counted when RESET is driven high.
    pub fn reset_pulses(&self) -> usize {
        self.reset_pulses
    }

    /// SCK rising edges seen while the target was listening.
    pub fn sck_rising_edges(&self) -> usize {
        self.sck_rises
    }

    // ------------------------------------------------------------------------
    // Target side
    // ------------------------------------------------------------------------

    fn update_reset(&mut self) {
        let driven = self.outputs[line_index(IspLine::Reset)];
        let high = self.levels[line_index(IspLine::Reset)];
        let held = driven && !high;
        if held == self.listening {
            return;
        }
        if !held && driven {
            self.reset_pulses += 1;
        }
        self.listening = held;
        self.programming = false;
        self.frame.clear();
        self.shift_in = 0;
        self.shift_out = 0xFF;
        self.bit_count = 0;
        self.last_rise = None;
        self.too_fast = false;
    }

    fn sck_rise(&mut self) {
        let now = self.clock.peek();
        if let Some(previous) = self.last_rise {
            let period = now.wrapping_sub(previous).saturating_mul(CYCLES_PER_TICK);
            if period < self.min_sck_period_cycles {
                self.too_fast = true;
            }
        }
        self.last_rise = Some(now);
        self.sck_rises += 1;

        let mosi = self.levels[line_index(IspLine::Mosi)];
        self.shift_in = (self.shift_in << 1) | u8::from(mosi);
    }

    fn sck_fall(&mut self) {
        self.shift_out = (self.shift_out << 1) | 1;
        self.bit_count += 1;
        if self.bit_count == 8 {
            let garbled = self.too_fast;
            self.bit_count = 0;
            self.too_fast = false;
            self.shift_out = self.receive(self.shift_in, garbled);
        }
    }

    /// Handle one received byte, returning the byte to shift out next.
    fn receive(&mut self, byte: u8, garbled: bool) -> u8 {
        if garbled {
            self.frame.clear();
            return 0xFF;
        }
        // capacity is 4 and the frame is cleared on the 4th byte
        let _ = self.frame.push(byte);

        let next = match self.frame.len() {
            2 if !self.programming => {
                if self.frame[..] != [0xAC, 0x53] {
                    0x00
                } else if self.enables_to_ignore > 0 {
                    self.enables_to_ignore -= 1;
                    0x00
                } else {
                    self.programming = true;
                    byte
                }
            }
            3 if self.programming => self.read_result().unwrap_or(byte),
            _ if self.programming => byte,
            _ => 0x00,
        };

        if self.frame.len() == 4 {
            let command = [self.frame[0], self.frame[1], self.frame[2], self.frame[3]];
            self.frame.clear();
            self.log.push(command);
            if self.programming {
                self.execute(command);
            }
        }
        next
    }

    fn word_address(&self, high: u8, low: u8) -> usize {
        (usize::from(self.extended) << 16) | (usize::from(high) << 8) | usize::from(low)
    }

    fn flash_index(&self, op: u8, high: u8, low: u8) -> usize {
        let byte = self.word_address(high, low) * 2 + usize::from(op & 0x08 != 0);
        byte % self.flash.len()
    }

    fn read_result(&self) -> Option<u8> {
        let (op, high, low) = (self.frame[0], self.frame[1], self.frame[2]);
        match op {
            0x20 | 0x28 => Some(self.read_flash_byte(self.flash_index(op, high, low))),
            0xA0 => {
                let address = usize::from(u16::from_be_bytes([high, low]));
                Some(self.eeprom[address % self.eeprom.len()])
            }
            0x30 => Some(self.signature.get(usize::from(low & 0x03)).copied().unwrap_or(0xFF)),
            _ => None,
        }
    }

    fn read_flash_byte(&self, index: usize) -> u8 {
        if let Some(busy) = self.busy {
            let pending =
                self.stuck_busy || self.clock.peek().wrapping_sub(busy.start) < busy.ticks;
            if pending && (busy.first..busy.end).contains(&index) {
                return busy.value;
            }
        }
        self.flash[index]
    }

    fn execute(&mut self, command: [u8; 4]) {
        let [op, high, low, data] = command;
        match op {
            0x40 | 0x48 => {
                let index = self.flash_index(op, high, low);
                match self.flash_mode {
                    FlashMode::Byte => {
                        self.flash[index] = data;
                        self.start_busy(index, index + 1, 0x7F);
                    }
                    FlashMode::Paged { .. } => {
                        let offset = index % self.page_buffer.len();
                        self.page_buffer[offset] = Some(data);
                    }
                }
            }
            0x4C => {
                if let FlashMode::Paged { .. } = self.flash_mode {
                    let index = self.flash_index(op, high, low);
                    let base = index - index % self.page_buffer.len();
                    let len = self.flash.len();
                    for (offset, slot) in self.page_buffer.iter_mut().enumerate() {
                        if let Some(byte) = slot.take() {
                            self.flash[(base + offset) % len] = byte;
                        }
                    }
                    let end = base + self.page_buffer.len();
                    self.start_busy(base, end, 0xFF);
                }
            }
            0x4D => self.extended = low,
            0xC0 => {
                let address = usize::from(u16::from_be_bytes([high, low]));
                let len = self.eeprom.len();
                self.eeprom[address % len] = data;
            }
            0xAC if high == 0x80 => {
                self.flash.fill(0xFF);
                self.eeprom.fill(0xFF);
            }
            _ => {}
        }
    }

    fn start_busy(&mut self, first: usize, end: usize, value: u8) {
        self.busy = Some(BusyWindow {
            start: self.clock.peek(),
            ticks: self.write_busy_ticks,
            first,
            end,
            value,
        });
    }

    fn bit_banging(&self) -> bool {
        self.listening && !self.spi_enabled && self.outputs[line_index(IspLine::Sck)]
    }
}

fn line_index(line: IspLine) -> usize {
    match line {
        IspLine::Reset => 0,
        IspLine::Sck => 1,
        IspLine::Mosi => 2,
    }
}

fn page_bytes(mode: FlashMode) -> usize {
    match mode {
        FlashMode::Byte => 0,
        FlashMode::Paged { page_words } => usize::from(page_words.max(1)) * 2,
    }
}

impl IspPins for SimulatedTarget {
    fn set_output(&mut self, line: IspLine, output: bool) {
        self.outputs[line_index(line)] = output;
        if line == IspLine::Reset {
            self.update_reset();
        }
    }

    fn set_level(&mut self, line: IspLine, high: bool) {
        let index = line_index(line);
        let previous = self.levels[index];
        self.levels[index] = high;

        match line {
            IspLine::Reset => self.update_reset(),
            IspLine::Sck if self.bit_banging() => match (previous, high) {
                (false, true) => self.sck_rise(),
                (true, false) => self.sck_fall(),
                _ => {}
            },
            _ => {}
        }
    }

    fn set_miso_pullup(&mut self, enabled: bool) {
        self.miso_pullup = enabled;
    }

    fn read_miso(&self) -> bool {
        if self.listening {
            self.shift_out & 0x80 != 0
        } else {
            self.miso_pullup
        }
    }
}

impl SpiPeripheral for SimulatedTarget {
    fn set_clock(&mut self, clock: SpiClock) {
        self.spi_clock = Some(clock);
    }

    fn enable_master(&mut self) {
        self.spi_enabled = true;
        self.spi_enable_count += 1;
    }

    fn disable(&mut self) {
        self.spi_enabled = false;
    }

    fn start_transfer(&mut self, byte: u8) {
        assert!(self.spi_enabled, "SPI transfer started with peripheral disabled");

        self.spi_data = if self.listening {
            let out = self.shift_out;
            let ratio = self.spi_clock.map_or(4, |c| u32::from(c.ratio()));
            let garbled = ratio < self.min_sck_period_cycles;
            self.shift_out = self.receive(byte, garbled);
            out
        } else if self.miso_pullup {
            0xFF
        } else {
            0x00
        };
        self.spi_complete = true;
    }

    fn transfer_complete(&self) -> bool {
        self.spi_complete
    }

    fn read_data(&mut self) -> u8 {
        self.spi_complete = false;
        self.spi_data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listening_target() -> SimulatedTarget {
        let mut target = SimulatedTarget::new(MockClock::new());
        for line in IspLine::ALL {
            target.set_output(line, true);
        }
        target
    }

    fn exchange(target: &mut SimulatedTarget, command: [u8; 4]) -> [u8; 4] {
        let mut echo = [0u8; 4];
        for (slot, byte) in echo.iter_mut().zip(command) {
            target.start_transfer(byte);
            *slot = target.read_data();
        }
        echo
    }

    // =========================================================================
    // MockClock Tests
    // =========================================================================

    #[test]
    fn clock_clones_share_counter() {
        let clock = MockClock::new();
        let other = clock.clone();
        clock.now_ticks();
        clock.now_ticks();
        assert_eq!(other.peek(), 2);
        other.advance(10);
        assert_eq!(clock.peek(), 12);
    }

    #[test]
    fn clock_wraps() {
        let clock = MockClock::starting_at(u32::MAX);
        assert_eq!(clock.now_ticks(), u32::MAX);
        assert_eq!(clock.now_ticks(), 0);
    }

    #[test]
    fn frozen_clock_does_not_advance() {
        let clock = MockClock::new().with_step(0);
        clock.now_ticks();
        assert_eq!(clock.peek(), 0);
    }

    // =========================================================================
    // Target Tests
    // =========================================================================

    #[test]
    fn reset_low_starts_listening() {
        let mut target = SimulatedTarget::new(MockClock::new());
        assert!(!target.listening);
        target.set_output(IspLine::Reset, true);
        assert!(target.listening);
        target.set_level(IspLine::Reset, true);
        assert!(!target.listening);
    }

    #[test]
    fn programming_enable_echoes_second_byte() {
        let mut target = listening_target();
        target.enable_master();
        let echo = exchange(&mut target, [0xAC, 0x53, 0x00, 0x00]);
        assert_eq!(echo[2], 0x53);
        assert!(target.programming_enabled());
        assert_eq!(target.commands(), &[[0xAC, 0x53, 0x00, 0x00]]);
    }

    #[test]
    fn commands_ignored_before_enable() {
        let mut target = listening_target();
        target.enable_master();
        let echo = exchange(&mut target, [0xC0, 0x00, 0x00, 0x12]);
        assert_eq!(echo[3], 0x00);
        assert_eq!(target.eeprom()[0], 0xFF);
    }

    #[test]
    fn reset_pulse_drops_programming_mode() {
        let mut target = listening_target();
        target.enable_master();
        exchange(&mut target, [0xAC, 0x53, 0x00, 0x00]);
        target.set_level(IspLine::Reset, true);
        target.set_level(IspLine::Reset, false);
        assert!(!target.programming_enabled());
    }

    #[test]
    fn ignored_enables_need_fresh_attempts() {
        let mut target = listening_target().with_ignored_enables(1);
        target.enable_master();
        assert_eq!(exchange(&mut target, [0xAC, 0x53, 0x00, 0x00])[2], 0x00);
        assert!(!target.programming_enabled());

        target.set_level(IspLine::Reset, true);
        target.set_level(IspLine::Reset, false);
        assert_eq!(exchange(&mut target, [0xAC, 0x53, 0x00, 0x00])[2], 0x53);
        assert_eq!(target.reset_pulses(), 1);
    }

    #[test]
    fn releasing_reset_is_not_a_pulse() {
        let mut target = listening_target();
        target.set_output(IspLine::Reset, false);
        assert_eq!(target.reset_pulses(), 0);
    }

    #[test]
    fn too_fast_hardware_clock_is_garbled() {
        let mut target = listening_target().with_min_sck_period_cycles(16);
        target.set_clock(SpiClock {
            divider: crate::speed::SpiDivider::Div4,
            double_speed: true,
        });
        target.enable_master();
        let echo = exchange(&mut target, [0xAC, 0x53, 0x00, 0x00]);
        assert_eq!(echo[2], 0xFF);
        assert!(!target.programming_enabled());
    }

    #[test]
    fn extended_address_selects_upper_window() {
        let mut target = listening_target();
        target.enable_master();
        exchange(&mut target, [0xAC, 0x53, 0x00, 0x00]);
        target.load_flash(0x2_0000, &[0xA5]);
        exchange(&mut target, [0x4D, 0x00, 0x01, 0x00]);
        let echo = exchange(&mut target, [0x20, 0x00, 0x00, 0x00]);
        assert_eq!(echo[3], 0xA5);
        assert_eq!(target.extended_address(), 1);
    }

    #[test]
    fn byte_write_reads_busy_until_done() {
        let clock = MockClock::new().with_step(0);
        let mut target = SimulatedTarget::new(clock.clone())
            .with_flash_mode(FlashMode::Byte)
            .with_write_busy_ticks(10);
        for line in IspLine::ALL {
            target.set_output(line, true);
        }
        target.enable_master();
        exchange(&mut target, [0xAC, 0x53, 0x00, 0x00]);
        exchange(&mut target, [0x40, 0x00, 0x08, 0x3C]);

        assert_eq!(exchange(&mut target, [0x20, 0x00, 0x08, 0x00])[3], 0x7F);
        clock.advance(10);
        assert_eq!(exchange(&mut target, [0x20, 0x00, 0x08, 0x00])[3], 0x3C);
    }

    #[test]
    fn miso_floats_to_pullup_when_not_listening() {
        let mut target = SimulatedTarget::new(MockClock::new());
        assert!(!target.read_miso());
        target.set_miso_pullup(true);
        assert!(target.read_miso());
    }
}
