//! SPI configuration record and its CR1 encoding.

use crate::spi::regs::{
    CR1_BIDIMODE, CR1_BIDIOE, CR1_BR_SHIFT, CR1_CPHA, CR1_CPOL, CR1_DFF, CR1_LSBFIRST, CR1_MSTR,
    CR1_RXONLY, CR1_SSI, CR1_SSM,
};

/// SCK divider applied to the peripheral clock (CR1.BR).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BaudRate {
    /// f_PCLK / 2
    Div2,
    /// f_PCLK / 4
    Div4,
    /// f_PCLK / 8
    Div8,
    /// f_PCLK / 16
    Div16,
    /// f_PCLK / 32
    Div32,
    /// f_PCLK / 64
    Div64,
    /// f_PCLK / 128
    Div128,
    /// f_PCLK / 256
    Div256,
}

impl BaudRate {
    /// BR\[2:0\] field value.
    pub const fn bits(self) -> u32 {
        match self {
            Self::Div2 => 0,
            Self::Div4 => 1,
            Self::Div8 => 2,
            Self::Div16 => 3,
            Self::Div32 => 4,
            Self::Div64 => 5,
            Self::Div128 => 6,
            Self::Div256 => 7,
        }
    }

    /// Divider as an integer.
    pub const fn divisor(self) -> u32 {
        2u32.wrapping_shl(self.bits())
    }

    /// SCK frequency for a given peripheral clock.
    #[allow(clippy::arithmetic_side_effects)] // divisor is 2..=256
    pub const fn sck_hz(self, pclk_hz: u32) -> u32 {
        pclk_hz / self.divisor()
    }
}

/// Clock phase (CR1.CPHA).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockPhase {
    /// Data captured on the first clock edge
    FirstEdge,
    /// Data captured on the second clock edge
    SecondEdge,
}

/// Clock polarity (CR1.CPOL).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockPolarity {
    /// SCK idles low
    IdleLow,
    /// SCK idles high
    IdleHigh,
}

/// SPI modes (CPOL, CPHA)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SpiMode {
    /// Mode 0: CPOL=0, CPHA=0
    Mode0,
    /// Mode 1: CPOL=0, CPHA=1
    Mode1,
    /// Mode 2: CPOL=1, CPHA=0
    Mode2,
    /// Mode 3: CPOL=1, CPHA=1
    Mode3,
}

impl SpiMode {
    /// Polarity and phase of this mode.
    pub const fn split(self) -> (ClockPolarity, ClockPhase) {
        match self {
            Self::Mode0 => (ClockPolarity::IdleLow, ClockPhase::FirstEdge),
            Self::Mode1 => (ClockPolarity::IdleLow, ClockPhase::SecondEdge),
            Self::Mode2 => (ClockPolarity::IdleHigh, ClockPhase::FirstEdge),
            Self::Mode3 => (ClockPolarity::IdleHigh, ClockPhase::SecondEdge),
        }
    }
}

/// Data frame width (CR1.DFF).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameWidth {
    /// 8-bit frames, byte access to DR
    Bits8,
    /// 16-bit frames, halfword access to DR
    Bits16,
}

impl FrameWidth {
    /// Bytes of caller buffer consumed per frame.
    pub const fn bytes(self) -> usize {
        match self {
            Self::Bits8 => 1,
            Self::Bits16 => 2,
        }
    }

    /// Width selected by a CR1 value.
    pub const fn from_cr1(cr1: u32) -> Self {
        if cr1 & CR1_DFF == 0 {
            Self::Bits8
        } else {
            Self::Bits16
        }
    }

    /// `true` if `len` bytes is a whole, non-zero number of frames.
    pub const fn accepts(self, len: usize) -> bool {
        matches!(len.checked_rem(self.bytes()), Some(0)) && len != 0
    }
}

/// Master or slave (CR1.MSTR).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Role {
    /// Drives SCK
    Master,
    /// Follows an external SCK
    Slave,
}

/// Bit order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BitOrder {
    /// Most significant bit first
    MsbFirst,
    /// Least significant bit first
    LsbFirst,
}

/// Wire configuration (CR1.BIDIMODE, BIDIOE, RXONLY).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusConfig {
    /// Two data lines, both directions
    FullDuplex,
    /// One bidirectional line, output enabled
    HalfDuplexTransmit,
    /// One bidirectional line, output disabled
    HalfDuplexReceive,
    /// Two lines, output disabled
    ReceiveOnly,
}

impl BusConfig {
    const fn bits(self) -> u32 {
        match self {
            Self::FullDuplex => 0,
            Self::HalfDuplexTransmit => CR1_BIDIMODE | CR1_BIDIOE,
            Self::HalfDuplexReceive => CR1_BIDIMODE,
            Self::ReceiveOnly => CR1_RXONLY,
        }
    }
}

/// Bound on busy-wait loops in the blocking paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PollLimit {
    /// Spin until the flag changes, however long that takes
    Unbounded,
    /// Give up after this many status reads
    Spins(u32),
}

impl PollLimit {
    /// Default bound: enough for a 256-divided SCK at any PCLK this family runs.
    pub const DEFAULT: Self = Self::Spins(100_000);
}

impl Default for PollLimit {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// SPI configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SpiConfig {
    /// SCK divider
    pub baud_rate: BaudRate,
    /// Capture edge
    pub phase: ClockPhase,
    /// Idle level
    pub polarity: ClockPolarity,
    /// Frame width
    pub frame_width: FrameWidth,
    /// Master or slave
    pub role: Role,
    /// Bit order
    pub bit_order: BitOrder,
    /// Data line wiring
    pub bus: BusConfig,
    /// Software slave management (CR1.SSM)
    pub software_slave: bool,
    /// Blocking-path wait bound
    pub poll_limit: PollLimit,
}

impl SpiConfig {
    /// Master, mode 0, MSB first, 8-bit, full duplex, f_PCLK/8, software NSS.
    pub const DEFAULT: Self = Self {
        baud_rate: BaudRate::Div8,
        phase: ClockPhase::FirstEdge,
        polarity: ClockPolarity::IdleLow,
        frame_width: FrameWidth::Bits8,
        role: Role::Master,
        bit_order: BitOrder::MsbFirst,
        bus: BusConfig::FullDuplex,
        software_slave: true,
        poll_limit: PollLimit::DEFAULT,
    };

    /// Replace polarity and phase with those of `mode`.
    #[must_use]
    pub const fn with_mode(mut self, mode: SpiMode) -> Self {
        let (polarity, phase) = mode.split();
        self.polarity = polarity;
        self.phase = phase;
        self
    }

    /// Replace the frame width.
    #[must_use]
    pub const fn with_frame_width(mut self, frame_width: FrameWidth) -> Self {
        self.frame_width = frame_width;
        self
    }

    /// CR1 image for this configuration, SPE clear.
    ///
    /// In master role with software slave management SSI is driven high, or
    /// the peripheral sees its own NSS low and drops out of master mode.
    pub const fn cr1(&self) -> u32 {
        let mut cr1 = self.baud_rate.bits().wrapping_shl(CR1_BR_SHIFT);
        if matches!(self.phase, ClockPhase::SecondEdge) {
            cr1 |= CR1_CPHA;
        }
        if matches!(self.polarity, ClockPolarity::IdleHigh) {
            cr1 |= CR1_CPOL;
        }
        if matches!(self.frame_width, FrameWidth::Bits16) {
            cr1 |= CR1_DFF;
        }
        if matches!(self.role, Role::Master) {
            cr1 |= CR1_MSTR;
        }
        if matches!(self.bit_order, BitOrder::LsbFirst) {
            cr1 |= CR1_LSBFIRST;
        }
        if self.software_slave {
            cr1 |= CR1_SSM;
            if matches!(self.role, Role::Master) {
                cr1 |= CR1_SSI;
            }
        }
        cr1 | self.bus.bits()
    }
}

impl Default for SpiConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_encodes_master_div8() {
        let cr1 = SpiConfig::DEFAULT.cr1();
        assert_eq!(cr1, CR1_MSTR | (2 << CR1_BR_SHIFT) | CR1_SSM | CR1_SSI);
    }

    #[test]
    fn mode3_sets_cpol_and_cpha() {
        let cr1 = SpiConfig::DEFAULT.with_mode(SpiMode::Mode3).cr1();
        assert_eq!(cr1 & (CR1_CPOL | CR1_CPHA), CR1_CPOL | CR1_CPHA);
    }

    #[test]
    fn slave_with_ssm_leaves_ssi_clear() {
        let config = SpiConfig {
            role: Role::Slave,
            ..SpiConfig::DEFAULT
        };
        let cr1 = config.cr1();
        assert_eq!(cr1 & CR1_SSI, 0);
        assert_eq!(cr1 & CR1_MSTR, 0);
        assert_ne!(cr1 & CR1_SSM, 0);
    }

    #[test]
    fn bus_configs_select_the_right_bits() {
        let cr1 = |bus| SpiConfig { bus, ..SpiConfig::DEFAULT }.cr1();
        assert_eq!(cr1(BusConfig::FullDuplex) & (CR1_BIDIMODE | CR1_BIDIOE | CR1_RXONLY), 0);
        assert_eq!(
            cr1(BusConfig::HalfDuplexTransmit) & (CR1_BIDIMODE | CR1_BIDIOE),
            CR1_BIDIMODE | CR1_BIDIOE
        );
        assert_eq!(cr1(BusConfig::HalfDuplexReceive) & CR1_BIDIOE, 0);
        assert_ne!(cr1(BusConfig::ReceiveOnly) & CR1_RXONLY, 0);
    }

    #[test]
    fn frame_width_round_trips_through_dff() {
        let cr1 = SpiConfig::DEFAULT.with_frame_width(FrameWidth::Bits16).cr1();
        assert_eq!(FrameWidth::from_cr1(cr1), FrameWidth::Bits16);
        assert_eq!(FrameWidth::from_cr1(0), FrameWidth::Bits8);
    }

    #[test]
    fn length_check_follows_frame_width() {
        assert!(FrameWidth::Bits8.accepts(5));
        assert!(!FrameWidth::Bits8.accepts(0));
        assert!(FrameWidth::Bits16.accepts(4));
        assert!(!FrameWidth::Bits16.accepts(3));
    }

    #[test]
    fn baud_divisors() {
        assert_eq!(BaudRate::Div2.divisor(), 2);
        assert_eq!(BaudRate::Div256.divisor(), 256);
        assert_eq!(BaudRate::Div8.sck_hz(84_000_000), 10_500_000);
    }
}
