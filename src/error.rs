//! Error types for the ISP engine.
//!
//! The host protocol only distinguishes success from failure, so every
//! error maps to the same wire status. The variants exist for callers that
//! want to know *why* an operation failed (and for log output).

use core::fmt;

/// Wire status reported to the host for a successful operation.
pub const STATUS_OK: u8 = 0;

/// Wire status reported to the host for any failed operation.
pub const STATUS_FAILED: u8 = 1;

/// ISP engine error - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IspError {
    /// The target never echoed the programming-enable response, at any
    /// speed tier of the fallback ladder.
    HandshakeFailed,
    /// A flash byte or page write did not clear its busy sentinel within the
    /// bounded retry budget.
    PollTimeout {
        /// Flash byte address that was being polled
        address: u32,
    },
    /// The session has released the link; nothing was sent.
    Disconnected,
}

impl IspError {
    /// Status byte forwarded to the host for this error.
    #[inline]
    pub const fn status_code(&self) -> u8 {
        STATUS_FAILED
    }
}

impl fmt::Display for IspError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HandshakeFailed => {
                write!(f, "target did not answer programming enable at any speed")
            }
            Self::PollTimeout { address } => {
                write!(f, "write at 0x{:06X} did not complete in time", address)
            }
            Self::Disconnected => write!(f, "ISP link already released"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for IspError {}

/// Result type alias using [`IspError`]
pub type Result<T> = core::result::Result<T, IspError>;

/// Collapse an operation result into the host's two-valued status byte.
///
/// ```
/// use avr_isp::error::{status_of, IspError, STATUS_FAILED, STATUS_OK};
///
/// assert_eq!(status_of(&Ok::<u8, IspError>(0x1E)), STATUS_OK);
/// assert_eq!(status_of::<()>(&Err(IspError::HandshakeFailed)), STATUS_FAILED);
/// ```
pub fn status_of<T>(result: &Result<T>) -> u8 {
    match result {
        Ok(_) => STATUS_OK,
        Err(e) => e.status_code(),
    }
}
