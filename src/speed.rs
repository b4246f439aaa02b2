//! Speed Controller: SCK speed tiers and their transport configuration.
//!
//! The host selects one of a fixed set of SCK speeds. Fast tiers are
//! clocked by the hardware SPI peripheral, using the divide ratios it can
//! reach (÷4 … ÷128, with the double-speed bit filling in ÷8 and ÷32).
//! Slow tiers are bit-banged, with a half-period delay that doubles for
//! every step down the ladder.
//!
//! # Example
//!
//! ```rust
//! use avr_isp::speed::{configure, SckSpeed};
//! use avr_isp::Transport;
//!
//! // Auto resolves to the 1.5 MHz hardware tier
//! match configure(SckSpeed::Auto) {
//!     Transport::Hardware { clock } => assert_eq!(clock.ratio(), 8),
//!     Transport::Software { .. } => unreachable!(),
//! }
//!
//! // 8 kHz is bit-banged
//! assert_eq!(
//!     configure(SckSpeed::Khz8),
//!     Transport::Software { half_period_ticks: 12 }
//! );
//! ```

use crate::transport::Transport;

/// SCK speed tier, ordered from slowest to fastest.
///
/// The discriminants are the option codes used by the host protocol;
/// [`Auto`](Self::Auto) asks the engine to pick [`DEFAULT_SPEED`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[repr(u8)]
pub enum SckSpeed {
    /// Let the engine choose.
    #[default]
    Auto = 0,
    /// 500 Hz (bit-banged)
    Hz500 = 1,
    /// 1 kHz (bit-banged)
    Khz1 = 2,
    /// 2 kHz (bit-banged)
    Khz2 = 3,
    /// 4 kHz (bit-banged)
    Khz4 = 4,
    /// 8 kHz (bit-banged)
    Khz8 = 5,
    /// 16 kHz (bit-banged)
    Khz16 = 6,
    /// 32 kHz (bit-banged)
    Khz32 = 7,
    /// 93.75 kHz, XTAL/128
    Khz93_75 = 8,
    /// 187.5 kHz, XTAL/64
    Khz187_5 = 9,
    /// 375 kHz, XTAL/32
    Khz375 = 10,
    /// 750 kHz, XTAL/16
    Khz750 = 11,
    /// 1.5 MHz, XTAL/8
    Khz1500 = 12,
    /// 3 MHz, XTAL/4
    Mhz3 = 13,
}

/// Tier used when the host asks for [`SckSpeed::Auto`].
pub const DEFAULT_SPEED: SckSpeed = SckSpeed::Khz1500;

/// Slowest tier of the ladder.
pub const SLOWEST_SPEED: SckSpeed = SckSpeed::Hz500;

/// Slowest tier that is clocked by the hardware peripheral.
pub const HARDWARE_CUTOFF: SckSpeed = SckSpeed::Khz93_75;

/// Half-period delay (in ticks) of the fastest bit-banged tier.
pub const SOFTWARE_DELAY_BASE: u16 = 3;

impl SckSpeed {
    /// All concrete tiers, slowest first.
    pub const LADDER: [SckSpeed; 13] = [
        SckSpeed::Hz500,
        SckSpeed::Khz1,
        SckSpeed::Khz2,
        SckSpeed::Khz4,
        SckSpeed::Khz8,
        SckSpeed::Khz16,
        SckSpeed::Khz32,
        SckSpeed::Khz93_75,
        SckSpeed::Khz187_5,
        SckSpeed::Khz375,
        SckSpeed::Khz750,
        SckSpeed::Khz1500,
        SckSpeed::Mhz3,
    ];

    /// Host protocol option code.
    #[inline]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Parse a host protocol option code.
    ///
    /// ```
    /// use avr_isp::SckSpeed;
    ///
    /// assert_eq!(SckSpeed::from_code(0), Some(SckSpeed::Auto));
    /// assert_eq!(SckSpeed::from_code(12), Some(SckSpeed::Khz1500));
    /// assert_eq!(SckSpeed::from_code(14), None);
    /// ```
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(SckSpeed::Auto),
            c => Self::LADDER.get(usize::from(c) - 1).copied(),
        }
    }

    /// Replaces [`Auto`](Self::Auto) with [`DEFAULT_SPEED`].
    #[inline]
    pub fn resolve(self) -> Self {
        match self {
            SckSpeed::Auto => DEFAULT_SPEED,
            other => other,
        }
    }

    /// Nominal SCK frequency, `None` for [`Auto`](Self::Auto).
    pub const fn frequency_hz(self) -> Option<u32> {
        let hz = match self {
            SckSpeed::Auto => return None,
            SckSpeed::Hz500 => 500,
            SckSpeed::Khz1 => 1_000,
            SckSpeed::Khz2 => 2_000,
            SckSpeed::Khz4 => 4_000,
            SckSpeed::Khz8 => 8_000,
            SckSpeed::Khz16 => 16_000,
            SckSpeed::Khz32 => 32_000,
            SckSpeed::Khz93_75 => 93_750,
            SckSpeed::Khz187_5 => 187_500,
            SckSpeed::Khz375 => 375_000,
            SckSpeed::Khz750 => 750_000,
            SckSpeed::Khz1500 => 1_500_000,
            SckSpeed::Mhz3 => 3_000_000,
        };
        Some(hz)
    }

    /// Fastest tier whose nominal frequency does not exceed `hz`.
    ///
    /// Requests below the slowest tier get the slowest tier.
    ///
    /// ```
    /// use avr_isp::SckSpeed;
    ///
    /// assert_eq!(SckSpeed::at_most_hz(400_000), SckSpeed::Khz375);
    /// assert_eq!(SckSpeed::at_most_hz(10_000_000), SckSpeed::Mhz3);
    /// assert_eq!(SckSpeed::at_most_hz(100), SckSpeed::Hz500);
    /// ```
    pub fn at_most_hz(hz: u32) -> Self {
        Self::LADDER
            .iter()
            .rev()
            .copied()
            .find(|tier| tier.frequency_hz().is_some_and(|f| f <= hz))
            .unwrap_or(SLOWEST_SPEED)
    }

    /// Next slower tier, `None` at the bottom of the ladder.
    pub fn slower(self) -> Option<Self> {
        match self.resolve() {
            SckSpeed::Hz500 => None,
            tier => Self::from_code(tier.code() - 1),
        }
    }

    /// Next faster tier, `None` at the top of the ladder.
    pub fn faster(self) -> Option<Self> {
        Self::from_code(self.resolve().code() + 1)
    }

    /// Returns true if this tier is clocked by the hardware peripheral.
    #[inline]
    pub fn is_hardware(self) -> bool {
        self.resolve() >= HARDWARE_CUTOFF
    }
}

/// Base clock divider of the SPI peripheral (SPR1:SPR0).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SpiDivider {
    /// f/4
    Div4,
    /// f/16
    Div16,
    /// f/64
    Div64,
    /// f/128
    Div128,
}

impl SpiDivider {
    /// Divide ratio without double-speed mode.
    pub const fn ratio(self) -> u16 {
        match self {
            SpiDivider::Div4 => 4,
            SpiDivider::Div16 => 16,
            SpiDivider::Div64 => 64,
            SpiDivider::Div128 => 128,
        }
    }

    /// SPR1:SPR0 bit pattern for the control register.
    pub const fn spr_bits(self) -> u8 {
        match self {
            SpiDivider::Div4 => 0b00,
            SpiDivider::Div16 => 0b01,
            SpiDivider::Div64 => 0b10,
            SpiDivider::Div128 => 0b11,
        }
    }
}

/// Complete clock setting for the SPI peripheral.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpiClock {
    /// Base divider.
    pub divider: SpiDivider,
    /// Double-speed mode (SPI2X), halves the divide ratio.
    pub double_speed: bool,
}

impl SpiClock {
    const fn new(divider: SpiDivider, double_speed: bool) -> Self {
        Self {
            divider,
            double_speed,
        }
    }

    /// Effective divide ratio of the programmer clock.
    pub const fn ratio(&self) -> u16 {
        if self.double_speed {
            self.divider.ratio() / 2
        } else {
            self.divider.ratio()
        }
    }
}

/// Select the transport for a requested speed tier.
///
/// [`SckSpeed::Auto`] resolves to [`DEFAULT_SPEED`]. Tiers from
/// [`HARDWARE_CUTOFF`] upwards use the SPI peripheral; the tiers below it are
/// bit-banged with a half-period of `3 << (32 kHz - tier)` ticks.
pub fn configure(requested: SckSpeed) -> Transport {
    let tier = requested.resolve();
    if tier >= HARDWARE_CUTOFF {
        Transport::Hardware {
            clock: hardware_clock(tier),
        }
    } else {
        let steps = SckSpeed::Khz32.code() - tier.code();
        Transport::Software {
            half_period_ticks: SOFTWARE_DELAY_BASE << steps,
        }
    }
}

fn hardware_clock(tier: SckSpeed) -> SpiClock {
    match tier {
        SckSpeed::Mhz3 => SpiClock::new(SpiDivider::Div4, false),
        SckSpeed::Khz750 => SpiClock::new(SpiDivider::Div16, false),
        SckSpeed::Khz375 => SpiClock::new(SpiDivider::Div64, true),
        SckSpeed::Khz187_5 => SpiClock::new(SpiDivider::Div64, false),
        SckSpeed::Khz93_75 => SpiClock::new(SpiDivider::Div128, false),
        _ => SpiClock::new(SpiDivider::Div16, true),
    }
}
