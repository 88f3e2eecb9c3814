//! NVIC line enable/disable for the vectors this crate drives.
//!
//! Register layout: ARMv7-M ARM §B3.4 (ISER at +0x000, ICER at +0x080,
//! ISPR at +0x100, ICPR at +0x180 from [`NVIC_BASE`](crate::memory_map::NVIC_BASE)).
//! Every register is write-1-to-act, so enabling or disabling one line is a
//! single plain store that cannot disturb the others.
//!
//! On target, `cortex_m::peripheral::NVIC::{unmask, mask, pend, unpend}`
//! accept an [`Irq`] directly as well.

use cortex_m::interrupt::InterruptNumber;

use crate::register::Registers;

/// Interrupt set-enable register 0
pub const ISER: usize = 0x000;
/// Interrupt clear-enable register 0
pub const ICER: usize = 0x080;
/// Interrupt set-pending register 0
pub const ISPR: usize = 0x100;
/// Interrupt clear-pending register 0
pub const ICPR: usize = 0x180;

/// STM32F407 interrupt vectors used by the GPIO and SPI drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum Irq {
    /// EXTI line 0
    Exti0 = 6,
    /// EXTI line 1
    Exti1 = 7,
    /// EXTI line 2
    Exti2 = 8,
    /// EXTI line 3
    Exti3 = 9,
    /// EXTI line 4
    Exti4 = 10,
    /// EXTI lines 5..=9
    Exti9_5 = 23,
    /// SPI1 global
    Spi1 = 35,
    /// SPI2 global
    Spi2 = 36,
    /// EXTI lines 10..=15
    Exti15_10 = 40,
    /// SPI3 global
    Spi3 = 51,
}

impl Irq {
    /// Vector serving EXTI `line`, for the GPIO lines 0..=15.
    pub const fn for_exti_line(line: u8) -> Option<Self> {
        match line {
            0 => Some(Self::Exti0),
            1 => Some(Self::Exti1),
            2 => Some(Self::Exti2),
            3 => Some(Self::Exti3),
            4 => Some(Self::Exti4),
            5..=9 => Some(Self::Exti9_5),
            10..=15 => Some(Self::Exti15_10),
            _ => None,
        }
    }

    /// ISER/ICER word offset and bit for this vector.
    fn slot(self) -> (usize, u32) {
        let n = self as u16;
        let word = usize::from(n.wrapping_shr(5)).wrapping_mul(4);
        (word, 1u32.wrapping_shl(u32::from(n & 0x1F)))
    }
}

// SAFETY: every discriminant is a valid STM32F407 vector number.
unsafe impl InterruptNumber for Irq {
    fn number(self) -> u16 {
        self as u16
    }
}

/// The NVIC enable/pending registers.
#[derive(Debug, Clone)]
pub struct Nvic<R> {
    regs: R,
}

impl<R: Registers> Nvic<R> {
    /// Wrap the block starting at ISER0.
    pub const fn new(regs: R) -> Self {
        Self { regs }
    }

    /// Let `irq` reach the core.
    pub fn enable(&self, irq: Irq) {
        let (word, bit) = irq.slot();
        self.regs.write(ISER.wrapping_add(word), bit);
    }

    /// Stop `irq` reaching the core.
    pub fn disable(&self, irq: Irq) {
        let (word, bit) = irq.slot();
        self.regs.write(ICER.wrapping_add(word), bit);
    }

    /// `true` if `irq` is enabled.
    pub fn is_enabled(&self, irq: Irq) -> bool {
        let (word, bit) = irq.slot();
        self.regs.is_set(ISER.wrapping_add(word), bit)
    }

    /// Mark `irq` pending from software.
    pub fn pend(&self, irq: Irq) {
        let (word, bit) = irq.slot();
        self.regs.write(ISPR.wrapping_add(word), bit);
    }

    /// Clear a pending `irq`.
    pub fn unpend(&self, irq: Irq) {
        let (word, bit) = irq.slot();
        self.regs.write(ICPR.wrapping_add(word), bit);
    }
}
