//! Status flag query.

use crate::register::Registers;
use crate::spi::regs::{
    SpiRegs, SR_BSY, SR_CHSIDE, SR_CRCERR, SR_FRE, SR_MODF, SR_OVR, SR_RXNE, SR_TXE, SR_UDR,
};

/// Named SR bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Flag {
    /// Receive buffer not empty
    RxNotEmpty,
    /// Transmit buffer empty
    TxEmpty,
    /// I2S channel side
    ChannelSide,
    /// I2S underrun
    Underrun,
    /// CRC mismatch
    CrcError,
    /// Mode fault
    ModeFault,
    /// Overrun
    Overrun,
    /// Bus busy
    Busy,
    /// TI frame format error
    FrameFormatError,
}

impl Flag {
    /// SR mask for this flag.
    pub const fn mask(self) -> u32 {
        match self {
            Self::RxNotEmpty => SR_RXNE,
            Self::TxEmpty => SR_TXE,
            Self::ChannelSide => SR_CHSIDE,
            Self::Underrun => SR_UDR,
            Self::CrcError => SR_CRCERR,
            Self::ModeFault => SR_MODF,
            Self::Overrun => SR_OVR,
            Self::Busy => SR_BSY,
            Self::FrameFormatError => SR_FRE,
        }
    }
}

/// Value of a status flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlagStatus {
    /// Bit reads 1
    Set,
    /// Bit reads 0
    Reset,
}

impl FlagStatus {
    /// `true` for [`FlagStatus::Set`].
    pub const fn is_set(self) -> bool {
        matches!(self, Self::Set)
    }
}

impl From<bool> for FlagStatus {
    fn from(value: bool) -> Self {
        if value {
            Self::Set
        } else {
            Self::Reset
        }
    }
}

/// Read one status flag from the live SR.
///
/// Reading SR never clears anything on its own; RXNE only clears when DR is
/// read.
pub fn flag_status<R: Registers>(regs: &SpiRegs<R>, flag: Flag) -> FlagStatus {
    FlagStatus::from(regs.sr() & flag.mask() != 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::FakeSpi;

    #[test]
    fn reads_live_status() {
        let fake = FakeSpi::new();
        let regs = SpiRegs::new(&fake);
        assert_eq!(flag_status(&regs, Flag::TxEmpty), FlagStatus::Set);
        assert_eq!(flag_status(&regs, Flag::RxNotEmpty), FlagStatus::Reset);

        fake.set_tx_empty(false);
        fake.set_busy(true);
        assert_eq!(flag_status(&regs, Flag::TxEmpty), FlagStatus::Reset);
        assert!(flag_status(&regs, Flag::Busy).is_set());
    }

    #[test]
    fn error_flags_are_visible() {
        let fake = FakeSpi::new();
        fake.set_status_bits(SR_OVR | SR_MODF);
        let regs = SpiRegs::new(&fake);
        assert!(flag_status(&regs, Flag::Overrun).is_set());
        assert!(flag_status(&regs, Flag::ModeFault).is_set());
        assert!(!flag_status(&regs, Flag::CrcError).is_set());
    }
}
