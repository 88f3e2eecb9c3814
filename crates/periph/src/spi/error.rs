//! SPI driver errors.

use crate::spi::flag::Flag;

/// Why an SPI request was refused or abandoned.
///
/// Every variant is local to the call that returned it: no state was changed
/// by a rejected submission and the peripheral is still usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SpiError {
    /// The direction already has a transfer in flight.
    Busy,
    /// Length is zero or not a whole number of frames at the live frame width.
    InvalidLength {
        /// Rejected length in bytes
        len: usize,
    },
    /// A blocking wait exhausted its [`PollLimit`](crate::spi::PollLimit).
    Timeout {
        /// Flag that never reached the awaited state
        flag: Flag,
    },
    /// `SpiBus` word type does not match CR1.DFF.
    WordSize,
}

impl core::fmt::Display for SpiError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Busy => write!(f, "SPI transfer already in progress"),
            Self::InvalidLength { len } => {
                write!(f, "SPI transfer length {len} does not fit the frame width")
            }
            Self::Timeout { flag } => write!(f, "SPI timed out waiting on {flag:?}"),
            Self::WordSize => write!(f, "SPI word size does not match the frame width"),
        }
    }
}

impl embedded_hal::spi::Error for SpiError {
    fn kind(&self) -> embedded_hal::spi::ErrorKind {
        embedded_hal::spi::ErrorKind::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_length() {
        let msg = SpiError::InvalidLength { len: 3 }.to_string();
        assert!(msg.contains('3'));
    }

    #[test]
    fn timeout_names_the_flag() {
        let msg = SpiError::Timeout { flag: Flag::Busy }.to_string();
        assert!(msg.contains("Busy"));
    }
}
