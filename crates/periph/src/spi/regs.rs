//! STM32F4 SPI register map and typed register view.
//!
//! Reference: RM0090 Rev 19, §28.5 "SPI and I2S registers".
//!
//! Bit positions must match silicon exactly: the interrupt engine relies on
//! `CR2.TXEIE`/`CR2.RXNEIE` gating the NVIC line and on `SR.TXE`/`SR.RXNE`
//! reporting data-register state independently of those enables.

use crate::register::Registers;
use crate::spi::config::FrameWidth;

// ---------------------------------------------------------------------------
// Register offsets
// ---------------------------------------------------------------------------

/// Control register 1
pub const CR1: usize = 0x00;
/// Control register 2
pub const CR2: usize = 0x04;
/// Status register
pub const SR: usize = 0x08;
/// Data register (8 or 16 bit frames, access width must match)
pub const DR: usize = 0x0C;

// ---------------------------------------------------------------------------
// CR1 fields
// ---------------------------------------------------------------------------

/// Clock phase: 1 = second clock transition is the first data capture edge.
pub const CR1_CPHA: u32 = 1 << 0;
/// Clock polarity: 1 = SCK idles high.
pub const CR1_CPOL: u32 = 1 << 1;
/// Master selection.
pub const CR1_MSTR: u32 = 1 << 2;
/// Baud rate control field position (BR\[2:0\], f_PCLK / 2^(BR+1)).
pub const CR1_BR_SHIFT: u32 = 3;
/// Baud rate control field mask.
pub const CR1_BR_MASK: u32 = 0b111 << CR1_BR_SHIFT;
/// SPI enable.
pub const CR1_SPE: u32 = 1 << 6;
/// Frame format: 1 = LSB transmitted first.
pub const CR1_LSBFIRST: u32 = 1 << 7;
/// Internal slave select (value forced onto NSS when SSM = 1).
pub const CR1_SSI: u32 = 1 << 8;
/// Software slave management.
pub const CR1_SSM: u32 = 1 << 9;
/// Receive only (2-line unidirectional, output disabled).
pub const CR1_RXONLY: u32 = 1 << 10;
/// Data frame format: 0 = 8-bit, 1 = 16-bit.
pub const CR1_DFF: u32 = 1 << 11;
/// Output enable in bidirectional mode (1 = transmit).
pub const CR1_BIDIOE: u32 = 1 << 14;
/// Bidirectional data mode (1-line).
pub const CR1_BIDIMODE: u32 = 1 << 15;

/// Every CR1 bit the driver's configuration owns. CRC bits (12, 13) are
/// left untouched.
pub const CR1_CONFIG_MASK: u32 = CR1_CPHA
    | CR1_CPOL
    | CR1_MSTR
    | CR1_BR_MASK
    | CR1_SPE
    | CR1_LSBFIRST
    | CR1_SSI
    | CR1_SSM
    | CR1_RXONLY
    | CR1_DFF
    | CR1_BIDIOE
    | CR1_BIDIMODE;

// ---------------------------------------------------------------------------
// CR2 fields
// ---------------------------------------------------------------------------

/// RX buffer not empty interrupt enable.
pub const CR2_RXNEIE: u32 = 1 << 6;
/// TX buffer empty interrupt enable.
pub const CR2_TXEIE: u32 = 1 << 7;

// ---------------------------------------------------------------------------
// SR flags
// ---------------------------------------------------------------------------

/// Receive buffer not empty. Cleared by reading DR.
pub const SR_RXNE: u32 = 1 << 0;
/// Transmit buffer empty.
pub const SR_TXE: u32 = 1 << 1;
/// Channel side (I2S only).
pub const SR_CHSIDE: u32 = 1 << 2;
/// Underrun (I2S only).
pub const SR_UDR: u32 = 1 << 3;
/// CRC error.
pub const SR_CRCERR: u32 = 1 << 4;
/// Mode fault.
pub const SR_MODF: u32 = 1 << 5;
/// Overrun.
pub const SR_OVR: u32 = 1 << 6;
/// Busy: a frame is in the shifter or the bus is otherwise occupied.
pub const SR_BSY: u32 = 1 << 7;
/// TI frame format error.
pub const SR_FRE: u32 = 1 << 8;

/// Typed view over one SPI register block.
///
/// Stateless: every method is a live register access.
#[derive(Debug, Clone)]
pub struct SpiRegs<R> {
    regs: R,
}

impl<R: Registers> SpiRegs<R> {
    /// Wrap a register block.
    pub const fn new(regs: R) -> Self {
        Self { regs }
    }

    /// Underlying register block.
    pub fn inner(&self) -> &R {
        &self.regs
    }

    /// Current CR1.
    pub fn cr1(&self) -> u32 {
        self.regs.read(CR1)
    }

    /// Replace the configuration-owned CR1 bits with `value`.
    pub fn write_cr1_config(&self, value: u32) {
        self.regs.write_field(CR1, CR1_CONFIG_MASK, value);
    }

    /// Set or clear CR1.SPE.
    pub fn set_spe(&self, enabled: bool) {
        if enabled {
            self.regs.set_bits(CR1, CR1_SPE);
        } else {
            self.regs.clear_bits(CR1, CR1_SPE);
        }
    }

    /// Frame width currently selected by CR1.DFF.
    pub fn frame_width(&self) -> FrameWidth {
        FrameWidth::from_cr1(self.cr1())
    }

    /// Current CR2.
    pub fn cr2(&self) -> u32 {
        self.regs.read(CR2)
    }

    /// Set `mask` in CR2 (read-modify-write under a critical section).
    pub fn arm(&self, mask: u32) {
        self.regs.set_bits(CR2, mask);
    }

    /// Clear `mask` in CR2 (read-modify-write under a critical section).
    pub fn disarm(&self, mask: u32) {
        self.regs.clear_bits(CR2, mask);
    }

    /// `true` if every bit of `mask` is set in CR2.
    pub fn is_armed(&self, mask: u32) -> bool {
        self.cr2() & mask == mask
    }

    /// Current SR.
    pub fn sr(&self) -> u32 {
        self.regs.read(SR)
    }

    /// Store one 8-bit frame (byte access).
    pub fn write_dr8(&self, frame: u8) {
        self.regs.write_u8(DR, frame);
    }

    /// Store one 16-bit frame (halfword access).
    pub fn write_dr16(&self, frame: u16) {
        self.regs.write_u16(DR, frame);
    }

    /// Load one 8-bit frame (byte access). Clears SR.RXNE in hardware.
    pub fn read_dr8(&self) -> u8 {
        self.regs.read_u8(DR)
    }

    /// Load one 16-bit frame (halfword access). Clears SR.RXNE in hardware.
    pub fn read_dr16(&self) -> u16 {
        self.regs.read_u16(DR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::FakeSpi;

    #[test]
    fn bit_positions_match_rm0090() {
        assert_eq!(CR1_DFF, 0x0800);
        assert_eq!(CR1_SPE, 0x0040);
        assert_eq!(CR1_BR_MASK, 0x0038);
        assert_eq!(CR2_TXEIE, 0x0080);
        assert_eq!(CR2_RXNEIE, 0x0040);
        assert_eq!(SR_TXE, 0x0002);
        assert_eq!(SR_RXNE, 0x0001);
        assert_eq!(SR_BSY, 0x0080);
    }

    #[test]
    fn config_write_preserves_crc_bits() {
        let fake = FakeSpi::new();
        fake.set_cr1(1 << 13);
        let regs = SpiRegs::new(&fake);
        regs.write_cr1_config(CR1_MSTR | CR1_DFF);
        assert_eq!(fake.cr1(), (1 << 13) | CR1_MSTR | CR1_DFF);
    }

    #[test]
    fn arm_and_disarm_touch_one_enable() {
        let fake = FakeSpi::new();
        let regs = SpiRegs::new(&fake);
        regs.arm(CR2_TXEIE);
        regs.arm(CR2_RXNEIE);
        regs.disarm(CR2_TXEIE);
        assert!(!regs.is_armed(CR2_TXEIE));
        assert!(regs.is_armed(CR2_RXNEIE));
    }
}
