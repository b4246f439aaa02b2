//! Addressing Tracker for flash beyond the first 128K-word window.
//!
//! Read and write commands only carry 16 bits of word address. Larger
//! devices take the remaining bits from a separately loaded extended
//! address byte, which the tracker caches so the load command is only sent
//! when the window actually changes.

/// Extended address byte of a flash byte address.
///
/// Bit 0 of a flash byte address selects the low/high byte of a word and
/// bits 16..1 travel inside the command, which leaves bits 24..17 for the
/// extended address.
#[inline]
pub const fn extended_byte(address: u32) -> u8 {
    (address >> 17) as u8
}

/// Cache of the last extended address byte sent to the target.
///
/// `None` means nothing has been sent since the last connect, so the first
/// flash access of a session always loads the extended address, even for
/// address 0.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExtendedAddress {
    cached: Option<u8>,
}

impl ExtendedAddress {
    /// Creates a tracker with nothing sent yet.
    pub const fn new() -> Self {
        Self { cached: None }
    }

    /// Forget the cached byte (on connect).
    pub fn invalidate(&mut self) {
        self.cached = None;
    }

    /// Last byte sent, if any.
    pub const fn cached(&self) -> Option<u8> {
        self.cached
    }

    /// Record an access to `address`.
    ///
    /// Returns the byte to load when it differs from the cached one; the
    /// caller must then send the load command. The cache is updated
    /// immediately.
    ///
    /// ```
    /// use avr_isp::ExtendedAddress;
    ///
    /// let mut ext = ExtendedAddress::new();
    /// assert_eq!(ext.update(0x0_0000), Some(0));
    /// assert_eq!(ext.update(0x1_FFFF), None);
    /// assert_eq!(ext.update(0x2_0000), Some(1));
    /// ```
    pub fn update(&mut self, address: u32) -> Option<u8> {
        let high = extended_byte(address);
        if self.cached == Some(high) {
            None
        } else {
            self.cached = Some(high);
            Some(high)
        }
    }
}
