//! Session Manager: link ownership, speed selection and the handshake.
//!
//! An [`IspSession`] owns the ISP hardware for the lifetime of one
//! programming session. Creating it connects the link; dropping it (or
//! calling [`IspSession::disconnect`]) releases the lines again.
//!
//! # Example
//!
//! ```rust
//! use avr_isp::{IspConfig, IspSession};
//! use avr_isp::hal::{MockClock, SimulatedTarget};
//!
//! let clock = MockClock::new();
//! let target = SimulatedTarget::new(clock.clone());
//!
//! let mut session = IspSession::connect(target, clock, IspConfig::default());
//! session.enter_programming_mode(false).unwrap();
//! assert_eq!(session.read_signature(), [0x1E, 0x98, 0x01]);
//!
//! session.disconnect();
//! assert!(!session.is_connected());
//! ```

use crate::address::ExtendedAddress;
use crate::config::IspConfig;
use crate::error::{IspError, Result};
use crate::speed::{self, SckSpeed};
use crate::traits::{Clock, IspLine, IspPins, SpiPeripheral};
use crate::transport::Transport;

/// Programming enable command; the target echoes byte 1 while byte 2 is sent.
pub const PROGRAMMING_ENABLE: [u8; 4] = [0xAC, 0x53, 0x00, 0x00];

/// Byte read back once the link is released.
const IDLE_BUS: u8 = 0xFF;

/// One programming session on an exclusively owned ISP link.
///
/// # Type Parameters
///
/// - `H`: control lines and SPI peripheral ([`IspPins`] + [`SpiPeripheral`])
/// - `C`: tick source ([`Clock`])
///
/// The session is the only owner of the link state: the active transport,
/// the speed tier and the extended address cache all live here and are
/// reset by [`connect`](Self::connect).
pub struct IspSession<H, C>
where
    H: IspPins + SpiPeripheral,
    C: Clock,
{
    pub(crate) hw: H,
    pub(crate) clock: C,
    pub(crate) config: IspConfig,
    transport: Transport,
    speed: Option<SckSpeed>,
    spi_enabled: bool,
    programming: bool,
    pub(crate) extended: ExtendedAddress,
    connected: bool,
}

impl<H, C> IspSession<H, C>
where
    H: IspPins + SpiPeripheral,
    C: Clock,
{
    /// Take over the link and reset the target.
    ///
    /// Switches SCK, MOSI and RESET to outputs one line at a time, enables
    /// the MISO pull-up, gives RESET a positive pulse and selects the
    /// configured speed. The extended address cache starts empty.
    pub fn connect(mut hw: H, clock: C, config: IspConfig) -> Self {
        for line in IspLine::ALL {
            hw.set_output(line, true);
        }
        hw.set_miso_pullup(true);

        let mut session = Self {
            hw,
            clock,
            config,
            transport: speed::configure(config.speed),
            speed: None,
            spi_enabled: false,
            programming: false,
            extended: ExtendedAddress::new(),
            connected: true,
        };

        session.pulse_reset();
        session.set_speed(config.speed);
        log::debug!("ISP connected, SCK {:?}", session.speed);
        session
    }

    /// Select the SCK speed for subsequent transfers.
    ///
    /// The peripheral is always disabled while it is reprogrammed. A
    /// hardware tier gets it enabled again if it was enabled before or the
    /// target is already in programming mode, so switching from a
    /// bit-banged tier to a hardware one mid-session keeps working.
    pub fn set_speed(&mut self, requested: SckSpeed) {
        let tier = requested.resolve();
        let enable = self.connected && (self.spi_enabled || self.programming);

        self.disable_spi();
        self.transport = speed::configure(tier);
        if let Transport::Hardware { clock } = self.transport {
            self.hw.set_clock(clock);
            if enable {
                self.enable_spi();
            }
        }
        self.speed = Some(tier);
    }

    /// Current speed tier, `None` if it has to be negotiated again.
    pub fn speed(&self) -> Option<SckSpeed> {
        self.speed
    }

    /// Active transport.
    pub fn transport(&self) -> Transport {
        self.transport
    }

    /// Put the target into serial programming mode.
    ///
    /// Starting at the configured tier, each tier gets
    /// [`handshake_tries`](IspConfig::handshake_tries) attempts of: pulse
    /// RESET, wait the settle interval, send [`PROGRAMMING_ENABLE`] and check
    /// the echo. After a tier fails the next slower one is tried, down to
    /// the bottom of the ladder. Targets fresh out of reset may run from a
    /// slow internal clock, which is why the ladder goes all the way down.
    ///
    /// With `bump_speed` the link steps one tier faster once the target
    /// has answered.
    ///
    /// # Errors
    ///
    /// [`IspError::HandshakeFailed`] if no tier produced the echo. The next
    /// call starts over from the default tier.
    ///
    /// [`IspError::Disconnected`] after [`disconnect`](Self::disconnect).
    pub fn enter_programming_mode(&mut self, bump_speed: bool) -> Result<()> {
        self.ensure_connected()?;
        self.programming = false;

        let mut tier = match self.speed {
            Some(tier) => tier,
            None => {
                self.set_speed(SckSpeed::Auto);
                speed::DEFAULT_SPEED
            }
        };
        let tries = self.config.handshake_tries.max(1);

        loop {
            if self.transport.is_hardware() {
                self.enable_spi();
            }

            for attempt in 1..=tries {
                log::trace!("programming enable at {:?}, attempt {}", tier, attempt);
                self.pulse_reset();
                self.wait_units(self.config.timing.settle_units);

                let echo = self.send_command(PROGRAMMING_ENABLE);
                if echo[2] == PROGRAMMING_ENABLE[1] {
                    log::debug!("programming mode entered at {:?}", tier);
                    self.programming = true;
                    if bump_speed {
                        self.bump_speed(tier);
                    }
                    return Ok(());
                }
            }

            self.disable_spi();
            match tier.slower() {
                Some(next) => {
                    log::debug!("no answer at {:?}, falling back to {:?}", tier, next);
                    self.set_speed(next);
                    tier = next;
                }
                None => {
                    log::warn!("target did not answer at any SCK speed");
                    self.speed = None;
                    return Err(IspError::HandshakeFailed);
                }
            }
        }
    }

    /// Same as [`enter_programming_mode`](Self::enter_programming_mode),
    /// using the configured [`bump_speed`](IspConfig::bump_speed).
    pub fn enter_programming_mode_default(&mut self) -> Result<()> {
        self.enter_programming_mode(self.config.bump_speed)
    }

    fn bump_speed(&mut self, tier: SckSpeed) {
        if let Some(faster) = tier.faster() {
            self.set_speed(faster);
            log::debug!("SCK bumped to {:?}", faster);
        }
    }

    /// Release the link.
    ///
    /// All control lines become inputs with their levels (and so their
    /// pull-ups) cleared, the MISO pull-up is removed and the SPI peripheral
    /// is disabled. Calling it again is harmless.
    ///
    /// The session stays around but no longer drives the link: writes and
    /// the handshake fail with [`IspError::Disconnected`] and reads return
    /// the idle bus value `0xFF`.
    pub fn disconnect(&mut self) {
        for line in [IspLine::Reset, IspLine::Sck, IspLine::Mosi] {
            self.hw.set_output(line, false);
        }
        for line in [IspLine::Reset, IspLine::Sck, IspLine::Mosi] {
            self.hw.set_level(line, false);
        }
        self.hw.set_miso_pullup(false);
        self.disable_spi();

        if self.connected {
            log::debug!("ISP disconnected");
        }
        self.connected = false;
        self.programming = false;
    }

    /// Returns true until [`disconnect`](Self::disconnect) is called.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Returns true once the target has accepted programming enable.
    pub fn in_programming_mode(&self) -> bool {
        self.programming
    }

    /// Returns true while the SPI peripheral is enabled.
    pub fn spi_enabled(&self) -> bool {
        self.spi_enabled
    }

    /// Session configuration.
    pub fn config(&self) -> &IspConfig {
        &self.config
    }

    /// The underlying hardware.
    pub fn hardware(&self) -> &H {
        &self.hw
    }

    /// Mutable access to the underlying hardware.
    pub fn hardware_mut(&mut self) -> &mut H {
        &mut self.hw
    }

    /// The tick source.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    // ------------------------------------------------------------------------
    // Link primitives shared with the memory operations
    // ------------------------------------------------------------------------

    pub(crate) fn ensure_connected(&self) -> Result<()> {
        if self.connected {
            Ok(())
        } else {
            Err(IspError::Disconnected)
        }
    }

    pub(crate) fn transmit(&mut self, byte: u8) -> u8 {
        if !self.connected {
            return IDLE_BUS;
        }
        let transport = self.transport;
        transport.transmit(&mut self.hw, &self.clock, byte)
    }

    pub(crate) fn send_command(&mut self, command: [u8; 4]) -> [u8; 4] {
        let mut echo = [0u8; 4];
        for (slot, byte) in echo.iter_mut().zip(command) {
            *slot = self.transmit(byte);
        }
        echo
    }

    pub(crate) fn wait_units(&self, units: u32) {
        self.clock.delay_ticks(self.config.timing.unit_ticks(units));
    }

    fn pulse_reset(&mut self) {
        self.hw.set_level(IspLine::Reset, true);
        self.wait_units(self.config.timing.reset_pulse_units);
        self.hw.set_level(IspLine::Reset, false);
    }

    fn enable_spi(&mut self) {
        self.hw.enable_master();
        self.spi_enabled = true;
    }

    fn disable_spi(&mut self) {
        self.hw.disable();
        self.spi_enabled = false;
    }
}

impl<H, C> Drop for IspSession<H, C>
where
    H: IspPins + SpiPeripheral,
    C: Clock,
{
    fn drop(&mut self) {
        if self.connected {
            self.disconnect();
        }
    }
}
