//! Session and timing configuration.
//!
//! All waits are expressed in *time units* of 320 µs, the granularity the
//! programmer firmware works in, and converted to clock ticks through
//! [`TimingConfig::ticks_per_unit`]. The defaults describe a 12 MHz
//! programmer with its tick counter prescaled by 64.
//!
//! # Example
//!
//! ```rust
//! use avr_isp::config::{IspConfig, TimingConfig};
//! use avr_isp::SckSpeed;
//!
//! // Use defaults
//! let config = IspConfig::default();
//! assert_eq!(config.handshake_tries, 3);
//!
//! // Or customize
//! let config = IspConfig::default()
//!     .with_speed(SckSpeed::Khz375)
//!     .with_timing(TimingConfig::default().with_settle_units(31));
//! assert_eq!(config.timing.settle_units, 31);
//! ```

use crate::speed::SckSpeed;

// ============================================================================
// Session Config
// ============================================================================

/// Complete session configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IspConfig {
    /// Tick and wait durations
    pub timing: TimingConfig,
    /// SCK speed configured on connect (`Auto` = default tier)
    pub speed: SckSpeed,
    /// Programming-enable attempts per speed tier
    pub handshake_tries: u8,
    /// Step one tier faster once programming mode is entered
    pub bump_speed: bool,
}

impl Default for IspConfig {
    fn default() -> Self {
        Self {
            timing: TimingConfig::default(),
            speed: SckSpeed::Auto,
            handshake_tries: 3,
            bump_speed: false,
        }
    }
}

impl IspConfig {
    /// Set timing configuration
    pub fn with_timing(mut self, timing: TimingConfig) -> Self {
        self.timing = timing;
        self
    }

    /// Set the initial SCK speed
    pub fn with_speed(mut self, speed: SckSpeed) -> Self {
        self.speed = speed;
        self
    }

    /// Set attempts per tier (at least one attempt is always made)
    pub fn with_handshake_tries(mut self, tries: u8) -> Self {
        self.handshake_tries = tries.max(1);
        self
    }

    /// Enable or disable the post-handshake speed bump
    pub fn with_bump_speed(mut self, bump: bool) -> Self {
        self.bump_speed = bump;
        self
    }
}

// ============================================================================
// Timing Config
// ============================================================================

/// Tick rate and fixed wait durations
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimingConfig {
    /// Tick counter frequency in Hz
    pub tick_hz: u32,
    /// Ticks in one 320 µs time unit
    pub ticks_per_unit: u32,
    /// RESET pulse width on connect and before each handshake attempt
    pub reset_pulse_units: u32,
    /// Wait between RESET release and programming enable (~20 ms)
    pub settle_units: u32,
    /// Fixed wait for flash writes that cannot be data-polled (~4.8 ms)
    pub write_wait_units: u32,
    /// Fixed wait after every EEPROM write (~9.6 ms)
    pub eeprom_wait_units: u32,
    /// Fixed wait after chip erase
    pub chip_erase_units: u32,
    /// Length of one data-polling retry window
    pub poll_window_units: u32,
    /// Retry windows before a data-polled write is declared failed
    pub poll_retries: u8,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tick_hz: 187_500,
            ticks_per_unit: 60,
            reset_pulse_units: 1,
            settle_units: 62,
            write_wait_units: 15,
            eeprom_wait_units: 30,
            chip_erase_units: 30,
            poll_window_units: 1,
            poll_retries: 30,
        }
    }
}

impl TimingConfig {
    /// Convert time units to clock ticks
    #[inline]
    pub fn unit_ticks(&self, units: u32) -> u32 {
        units.saturating_mul(self.ticks_per_unit)
    }

    /// Nominal duration of `units` time units in microseconds
    #[inline]
    pub const fn units_to_us(units: u32) -> u32 {
        units.saturating_mul(320)
    }

    /// Length of one polling window in ticks
    #[inline]
    pub fn poll_window_ticks(&self) -> u32 {
        self.unit_ticks(self.poll_window_units)
    }

    /// Set the tick rate
    pub fn with_tick_hz(mut self, hz: u32) -> Self {
        self.tick_hz = hz;
        self
    }

    /// Set ticks per time unit
    pub fn with_ticks_per_unit(mut self, ticks: u32) -> Self {
        self.ticks_per_unit = ticks;
        self
    }

    /// Set the RESET pulse width
    pub fn with_reset_pulse_units(mut self, units: u32) -> Self {
        self.reset_pulse_units = units;
        self
    }

    /// Set the settle interval before programming enable
    pub fn with_settle_units(mut self, units: u32) -> Self {
        self.settle_units = units;
        self
    }

    /// Set the fixed flash write wait
    pub fn with_write_wait_units(mut self, units: u32) -> Self {
        self.write_wait_units = units;
        self
    }

    /// Set the fixed EEPROM write wait
    pub fn with_eeprom_wait_units(mut self, units: u32) -> Self {
        self.eeprom_wait_units = units;
        self
    }

    /// Set the chip erase wait
    pub fn with_chip_erase_units(mut self, units: u32) -> Self {
        self.chip_erase_units = units;
        self
    }

    /// Set the polling window and retry budget
    pub fn with_polling(mut self, window_units: u32, retries: u8) -> Self {
        self.poll_window_units = window_units;
        self.poll_retries = retries;
        self
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = IspConfig::default();
        assert_eq!(config.speed, SckSpeed::Auto);
        assert_eq!(config.handshake_tries, 3);
        assert!(!config.bump_speed);
    }

    #[test]
    fn default_timing_matches_320us_units() {
        let timing = TimingConfig::default();
        // 60 ticks at 187.5 kHz is 320 µs
        assert_eq!(
            u64::from(timing.ticks_per_unit) * 1_000_000 / u64::from(timing.tick_hz),
            320
        );
        assert_eq!(timing.poll_retries, 30);
        assert_eq!(timing.poll_window_ticks(), 60);
        assert_eq!(TimingConfig::units_to_us(timing.write_wait_units), 4_800);
        assert_eq!(TimingConfig::units_to_us(timing.eeprom_wait_units), 9_600);
    }

    #[test]
    fn settle_is_about_twenty_ms() {
        let us = TimingConfig::units_to_us(TimingConfig::default().settle_units);
        assert!((19_000..=21_000).contains(&us));
    }

    #[test]
    fn unit_ticks_saturates() {
        let timing = TimingConfig::default();
        assert_eq!(timing.unit_ticks(2), 120);
        assert_eq!(timing.unit_ticks(u32::MAX), u32::MAX);
    }

    #[test]
    fn handshake_tries_never_zero() {
        let config = IspConfig::default().with_handshake_tries(0);
        assert_eq!(config.handshake_tries, 1);
    }

    #[test]
    fn builder_pattern() {
        let config = IspConfig::default()
            .with_speed(SckSpeed::Khz8)
            .with_bump_speed(true)
            .with_timing(
                TimingConfig::default()
                    .with_ticks_per_unit(10)
                    .with_polling(2, 5)
                    .with_write_wait_units(4),
            );

        assert_eq!(config.speed, SckSpeed::Khz8);
        assert!(config.bump_speed);
        assert_eq!(config.timing.ticks_per_unit, 10);
        assert_eq!(config.timing.poll_window_ticks(), 20);
        assert_eq!(config.timing.poll_retries, 5);
        assert_eq!(config.timing.write_wait_units, 4);
    }
}
