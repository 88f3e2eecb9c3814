//! External interrupt/event controller and its SYSCFG port routing.
//!
//! Register layout: RM0090 Rev 19, §12.3 "EXTI registers" and §9.2 "SYSCFG
//! registers". Lines 0..=15 follow GPIO pins (the port is picked in SYSCFG);
//! lines 16..=22 are wired to internal sources.

use crate::gpio::Port;
use crate::register::Registers;

/// Interrupt mask register
pub const IMR: usize = 0x00;
/// Event mask register
pub const EMR: usize = 0x04;
/// Rising trigger selection register
pub const RTSR: usize = 0x08;
/// Falling trigger selection register
pub const FTSR: usize = 0x0C;
/// Software interrupt event register
pub const SWIER: usize = 0x10;
/// Pending register (write 1 to clear)
pub const PR: usize = 0x14;

/// SYSCFG external interrupt configuration register 1 (lines 0..=3).
/// EXTICR2..4 follow at 4-byte steps.
pub const SYSCFG_EXTICR1: usize = 0x08;

/// Highest EXTI line on this family.
pub const MAX_LINE: u8 = 22;

/// Highest EXTI line that can be routed to a GPIO port.
pub const MAX_GPIO_LINE: u8 = 15;

/// What a triggered line raises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ExtiMode {
    /// Interrupt request to the NVIC (IMR)
    Interrupt,
    /// Wake-up event, no interrupt (EMR)
    Event,
}

impl ExtiMode {
    const fn register(self) -> usize {
        match self {
            Self::Interrupt => IMR,
            Self::Event => EMR,
        }
    }
}

/// Edge selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Trigger {
    /// Trigger on rising edge
    Rising,
    /// Trigger on falling edge
    Falling,
    /// Trigger on both edges
    Both,
}

/// Line configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ExtiConfig {
    /// Line number, 0..=22
    pub line: u8,
    /// `false` masks the line in `mode` and leaves the edge selection alone
    pub enabled: bool,
    /// Interrupt or event
    pub mode: ExtiMode,
    /// Edge selection
    pub trigger: Trigger,
}

/// EXTI errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ExtiError {
    /// Line number above [`MAX_LINE`]
    LineOutOfRange {
        /// Rejected line
        line: u8,
    },
    /// Line has no GPIO routing (above [`MAX_GPIO_LINE`])
    NotRoutable {
        /// Rejected line
        line: u8,
    },
}

impl core::fmt::Display for ExtiError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::LineOutOfRange { line } => write!(f, "EXTI line {line} does not exist"),
            Self::NotRoutable { line } => write!(f, "EXTI line {line} is not a GPIO line"),
        }
    }
}

fn line_mask(line: u8) -> Result<u32, ExtiError> {
    if line > MAX_LINE {
        return Err(ExtiError::LineOutOfRange { line });
    }
    Ok(1u32.wrapping_shl(u32::from(line)))
}

/// The EXTI block.
#[derive(Debug, Clone)]
pub struct Exti<R> {
    regs: R,
}

impl<R: Registers> Exti<R> {
    /// Wrap the EXTI register block.
    pub const fn new(regs: R) -> Self {
        Self { regs }
    }

    /// Underlying register block.
    pub fn registers(&self) -> &R {
        &self.regs
    }

    /// Configure one line.
    ///
    /// The line is masked in both IMR and EMR first. If enabled, the bit for
    /// `mode` is unmasked and the edge selection rewritten from scratch.
    pub fn init(&self, config: &ExtiConfig) -> Result<(), ExtiError> {
        let mask = line_mask(config.line)?;
        self.regs.clear_bits(IMR, mask);
        self.regs.clear_bits(EMR, mask);

        if config.enabled {
            self.regs.set_bits(config.mode.register(), mask);

            self.regs.clear_bits(RTSR, mask);
            self.regs.clear_bits(FTSR, mask);
            match config.trigger {
                Trigger::Rising => self.regs.set_bits(RTSR, mask),
                Trigger::Falling => self.regs.set_bits(FTSR, mask),
                Trigger::Both => {
                    self.regs.set_bits(RTSR, mask);
                    self.regs.set_bits(FTSR, mask);
                }
            }
        }

        #[cfg(feature = "defmt")]
        defmt::debug!("exti: line {=u8} {}", config.line, config);
        Ok(())
    }

    /// `true` if `line` has a pending request.
    pub fn is_pending(&self, line: u8) -> Result<bool, ExtiError> {
        let mask = line_mask(line)?;
        Ok(self.regs.is_set(PR, mask))
    }

    /// Acknowledge a pending request on `line`.
    ///
    /// PR is write-1-to-clear, so only this line's bit is written; a
    /// read-modify-write would also clear every other pending line.
    pub fn clear_pending(&self, line: u8) -> Result<(), ExtiError> {
        let mask = line_mask(line)?;
        self.regs.write(PR, mask);
        Ok(())
    }

    /// Raise `line` from software (SWIER).
    pub fn trigger_software(&self, line: u8) -> Result<(), ExtiError> {
        let mask = line_mask(line)?;
        self.regs.set_bits(SWIER, mask);
        Ok(())
    }
}

/// EXTICR register offset and field shift for a GPIO line.
fn exticr_field(line: u8) -> (usize, u32) {
    let register = usize::from(line.wrapping_shr(2));
    let slot = u32::from(line & 0x3);
    (
        SYSCFG_EXTICR1.wrapping_add(register.wrapping_mul(4)),
        slot.wrapping_mul(4),
    )
}

/// The SYSCFG block, as far as EXTI routing goes.
#[derive(Debug, Clone)]
pub struct Syscfg<R> {
    regs: R,
}

impl<R: Registers> Syscfg<R> {
    /// Wrap the SYSCFG register block.
    pub const fn new(regs: R) -> Self {
        Self { regs }
    }

    /// Connect EXTI `line` to the same-numbered pin of `port`.
    ///
    /// Only the line's 4-bit field in EXTICR\[line / 4\] changes.
    pub fn route(&self, port: Port, line: u8) -> Result<(), ExtiError> {
        if line > MAX_LINE {
            return Err(ExtiError::LineOutOfRange { line });
        }
        if line > MAX_GPIO_LINE {
            return Err(ExtiError::NotRoutable { line });
        }
        let (offset, shift) = exticr_field(line);
        self.regs.write_field(
            offset,
            0xFu32.wrapping_shl(shift),
            port.index().wrapping_shl(shift),
        );
        Ok(())
    }

    /// Port currently routed to `line`, as its EXTICR code.
    pub fn routed_code(&self, line: u8) -> Result<u32, ExtiError> {
        if line > MAX_GPIO_LINE {
            return Err(ExtiError::NotRoutable { line });
        }
        let (offset, shift) = exticr_field(line);
        Ok(self.regs.read(offset).wrapping_shr(shift) & 0xF)
    }
}
