//! GPIO port driver.
//!
//! Register layout: RM0090 Rev 19, §8.4 "GPIO registers". A [`GpioPort`]
//! configures and drives any subset of its sixteen pins at once through a
//! [`Pins`] mask; [`Pin`] narrows that to a single line and implements the
//! `embedded-hal` digital traits.

use core::convert::Infallible;

use crate::memory_map::{GPIOA_BASE, GPIO_PORT_STRIDE};
use crate::register::Registers;

/// Port mode register
pub const MODER: usize = 0x00;
/// Output type register
pub const OTYPER: usize = 0x04;
/// Output speed register
pub const OSPEEDR: usize = 0x08;
/// Pull-up/pull-down register
pub const PUPDR: usize = 0x0C;
/// Input data register
pub const IDR: usize = 0x10;
/// Output data register
pub const ODR: usize = 0x14;
/// Bit set/reset register (write-only)
pub const BSRR: usize = 0x18;
/// Configuration lock register
pub const LCKR: usize = 0x1C;
/// Alternate function low register (pins 0..=7)
pub const AFRL: usize = 0x20;
/// Alternate function high register (pins 8..=15)
pub const AFRH: usize = 0x24;

/// Lock key bit in LCKR.
pub const LCKR_LCKK: u32 = 1 << 16;

/// GPIO port letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Port {
    /// GPIOA
    A,
    /// GPIOB
    B,
    /// GPIOC
    C,
    /// GPIOD
    D,
    /// GPIOE
    E,
    /// GPIOF
    F,
    /// GPIOG
    G,
    /// GPIOH
    H,
    /// GPIOI
    I,
}

impl Port {
    /// Position of the port, A = 0. Also the SYSCFG EXTICR code.
    pub const fn index(self) -> u32 {
        match self {
            Self::A => 0,
            Self::B => 1,
            Self::C => 2,
            Self::D => 3,
            Self::E => 4,
            Self::F => 5,
            Self::G => 6,
            Self::H => 7,
            Self::I => 8,
        }
    }

    /// Register block base address.
    #[allow(clippy::arithmetic_side_effects)] // index <= 8, stride 0x400
    pub const fn base(self) -> usize {
        GPIOA_BASE + self.index() as usize * GPIO_PORT_STRIDE
    }
}

/// Set of pins on one port, bit `n` = pin `n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Pins(pub u16);

impl Pins {
    /// Pin 0
    pub const PIN_0: Self = Self(1 << 0);
    /// Pin 1
    pub const PIN_1: Self = Self(1 << 1);
    /// Pin 2
    pub const PIN_2: Self = Self(1 << 2);
    /// Pin 3
    pub const PIN_3: Self = Self(1 << 3);
    /// Pin 4
    pub const PIN_4: Self = Self(1 << 4);
    /// Pin 5
    pub const PIN_5: Self = Self(1 << 5);
    /// Pin 6
    pub const PIN_6: Self = Self(1 << 6);
    /// Pin 7
    pub const PIN_7: Self = Self(1 << 7);
    /// Pin 8
    pub const PIN_8: Self = Self(1 << 8);
    /// Pin 9
    pub const PIN_9: Self = Self(1 << 9);
    /// Pin 10
    pub const PIN_10: Self = Self(1 << 10);
    /// Pin 11
    pub const PIN_11: Self = Self(1 << 11);
    /// Pin 12
    pub const PIN_12: Self = Self(1 << 12);
    /// Pin 13
    pub const PIN_13: Self = Self(1 << 13);
    /// Pin 14
    pub const PIN_14: Self = Self(1 << 14);
    /// Pin 15
    pub const PIN_15: Self = Self(1 << 15);
    /// Every pin
    pub const ALL: Self = Self(0xFFFF);

    /// Single pin `n`, or `None` if `n > 15`.
    pub const fn pin(n: u8) -> Option<Self> {
        match 1u16.checked_shl(n as u32) {
            Some(bit) => Some(Self(bit)),
            None => None,
        }
    }

    /// Union of two sets.
    #[must_use]
    pub const fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Mask as a register word.
    pub const fn bits(self) -> u32 {
        self.0 as u32
    }

    /// `true` if no pin is selected.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Pin numbers in the set, lowest first.
    pub fn numbers(self) -> impl Iterator<Item = u32> {
        (0..16u32).filter(move |&n| self.0.wrapping_shr(n) & 1 != 0)
    }
}

impl core::ops::BitOr for Pins {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.with(rhs)
    }
}

/// MODER field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinMode {
    /// Digital input
    Input,
    /// General purpose output
    Output,
    /// Alternate function (peripheral owned)
    Alternate,
    /// Analog
    Analog,
}

impl PinMode {
    const fn bits(self) -> u32 {
        match self {
            Self::Input => 0b00,
            Self::Output => 0b01,
            Self::Alternate => 0b10,
            Self::Analog => 0b11,
        }
    }

    const fn drives_output(self) -> bool {
        matches!(self, Self::Output | Self::Alternate)
    }
}

/// OTYPER bit value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OutputType {
    /// Push-pull output
    PushPull,
    /// Open-drain output
    OpenDrain,
}

/// PUPDR field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Pull {
    /// Floating (no pull resistor)
    None,
    /// Pull-up
    Up,
    /// Pull-down
    Down,
}

impl Pull {
    const fn bits(self) -> u32 {
        match self {
            Self::None => 0b00,
            Self::Up => 0b01,
            Self::Down => 0b10,
        }
    }
}

/// OSPEEDR field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Speed {
    /// Low speed
    Low,
    /// Medium speed
    Medium,
    /// High speed
    High,
    /// Very high speed
    VeryHigh,
}

impl Speed {
    const fn bits(self) -> u32 {
        match self {
            Self::Low => 0b00,
            Self::Medium => 0b01,
            Self::High => 0b10,
            Self::VeryHigh => 0b11,
        }
    }
}

/// Alternate function number, AF0..=AF15.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AlternateFunction(u8);

impl AlternateFunction {
    /// AF5: SPI1/SPI2 on this family.
    pub const AF5: Self = Self(5);
    /// AF6: SPI3 on this family.
    pub const AF6: Self = Self(6);

    /// Validate an AF number.
    pub const fn try_new(af: u8) -> Result<Self, GpioError> {
        if af > 15 {
            Err(GpioError::InvalidAlternate { af })
        } else {
            Ok(Self(af))
        }
    }

    /// Raw AF number.
    pub const fn number(self) -> u8 {
        self.0
    }
}

/// Pin state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinState {
    /// High (logic 1)
    High,
    /// Low (logic 0)
    Low,
}

impl From<bool> for PinState {
    fn from(value: bool) -> Self {
        if value {
            Self::High
        } else {
            Self::Low
        }
    }
}

impl From<PinState> for bool {
    fn from(value: PinState) -> Self {
        matches!(value, PinState::High)
    }
}

/// Configuration applied to every pin in `pins`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinConfig {
    /// Pins to configure
    pub pins: Pins,
    /// Mode
    pub mode: PinMode,
    /// Output driver; only applied in output and alternate modes
    pub output_type: OutputType,
    /// Pull resistor
    pub pull: Pull,
    /// Slew rate; only applied in output and alternate modes
    pub speed: Speed,
    /// Alternate function; only applied in alternate mode
    pub alternate: AlternateFunction,
}

impl PinConfig {
    /// Floating input on `pins`.
    pub const fn input(pins: Pins) -> Self {
        Self {
            pins,
            mode: PinMode::Input,
            output_type: OutputType::PushPull,
            pull: Pull::None,
            speed: Speed::Low,
            alternate: AlternateFunction(0),
        }
    }

    /// Push-pull output on `pins`.
    pub const fn output(pins: Pins) -> Self {
        Self {
            mode: PinMode::Output,
            ..Self::input(pins)
        }
    }

    /// Push-pull, very-high-speed alternate function on `pins`.
    pub const fn alternate(pins: Pins, af: AlternateFunction) -> Self {
        Self {
            mode: PinMode::Alternate,
            speed: Speed::VeryHigh,
            alternate: af,
            ..Self::input(pins)
        }
    }

    /// Replace the pull resistor.
    #[must_use]
    pub const fn with_pull(mut self, pull: Pull) -> Self {
        self.pull = pull;
        self
    }
}

/// GPIO errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GpioError {
    /// Pin number above 15
    InvalidPin {
        /// Rejected pin number
        pin: u8,
    },
    /// Alternate function above 15
    InvalidAlternate {
        /// Rejected AF number
        af: u8,
    },
    /// LCKK did not read back set after the lock sequence
    LockFailed,
}

impl core::fmt::Display for GpioError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidPin { pin } => write!(f, "GPIO pin {pin} out of range"),
            Self::InvalidAlternate { af } => write!(f, "alternate function AF{af} out of range"),
            Self::LockFailed => write!(f, "GPIO configuration lock failed"),
        }
    }
}

/// Shift of an `width`-bit field for pin `n`.
fn field_shift(n: u32, width: u32) -> u32 {
    n.wrapping_mul(width)
}

/// One GPIO port.
#[derive(Debug, Clone)]
pub struct GpioPort<R> {
    regs: R,
}

impl<R: Registers> GpioPort<R> {
    /// Wrap a port register block.
    pub const fn new(regs: R) -> Self {
        Self { regs }
    }

    /// Underlying register block.
    pub fn registers(&self) -> &R {
        &self.regs
    }

    /// Apply `config` to every pin in `config.pins`.
    ///
    /// Fields that do not apply to the mode are left untouched: OTYPER and
    /// OSPEEDR outside output/alternate, AFRx outside alternate.
    pub fn init(&self, config: &PinConfig) {
        for n in config.pins.numbers() {
            let two = field_shift(n, 2);
            self.regs.write_field(
                MODER,
                0b11u32.wrapping_shl(two),
                config.mode.bits().wrapping_shl(two),
            );

            if config.mode.drives_output() {
                let open_drain = u32::from(config.output_type == OutputType::OpenDrain);
                self.regs
                    .write_field(OTYPER, 1u32.wrapping_shl(n), open_drain.wrapping_shl(n));
                self.regs.write_field(
                    OSPEEDR,
                    0b11u32.wrapping_shl(two),
                    config.speed.bits().wrapping_shl(two),
                );
            }

            self.regs.write_field(
                PUPDR,
                0b11u32.wrapping_shl(two),
                config.pull.bits().wrapping_shl(two),
            );

            if config.mode == PinMode::Alternate {
                let (afr, slot) = if n < 8 { (AFRL, n) } else { (AFRH, n.wrapping_sub(8)) };
                let four = field_shift(slot, 4);
                self.regs.write_field(
                    afr,
                    0b1111u32.wrapping_shl(four),
                    u32::from(config.alternate.number()).wrapping_shl(four),
                );
            }
        }

        #[cfg(feature = "defmt")]
        defmt::debug!("gpio: init pins={=u16:#x} mode={}", config.pins.0, config.mode);
    }

    /// Drive `pins` to `state` in one BSRR write.
    pub fn write(&self, pins: Pins, state: PinState) {
        let value = match state {
            PinState::High => pins.bits(),
            PinState::Low => pins.bits().wrapping_shl(16),
        };
        self.regs.write(BSRR, value);
    }

    /// [`PinState::High`] if any pin in `pins` reads high.
    pub fn read(&self, pins: Pins) -> PinState {
        PinState::from(self.regs.read(IDR) & pins.bits() != 0)
    }

    /// Whole input data register.
    #[allow(clippy::cast_possible_truncation)] // IDR is 16 bits wide
    pub fn read_port(&self) -> u16 {
        self.regs.read(IDR) as u16
    }

    /// [`PinState::High`] if any pin in `pins` is driven high by ODR.
    pub fn output_state(&self, pins: Pins) -> PinState {
        PinState::from(self.regs.read(ODR) & pins.bits() != 0)
    }

    /// Invert the output level of every pin in `pins` in one BSRR write.
    pub fn toggle(&self, pins: Pins) {
        let odr = self.regs.read(ODR);
        let mask = pins.bits();
        let reset = (odr & mask).wrapping_shl(16);
        let set = !odr & mask;
        self.regs.write(BSRR, reset | set);
    }

    /// Freeze the configuration of `pins` until the next reset.
    ///
    /// Runs the LCKR key sequence (write 1+pins, 0+pins, 1+pins, read, read)
    /// and checks LCKK reads back set.
    pub fn lock(&self, pins: Pins) -> Result<(), GpioError> {
        let key = LCKR_LCKK | pins.bits();
        self.regs.write(LCKR, key);
        self.regs.write(LCKR, pins.bits());
        self.regs.write(LCKR, key);
        let _ = self.regs.read(LCKR);
        if self.regs.read(LCKR) & LCKR_LCKK == 0 {
            #[cfg(feature = "defmt")]
            defmt::warn!("gpio: lock failed pins={=u16:#x}", pins.0);
            return Err(GpioError::LockFailed);
        }
        Ok(())
    }

    /// Handle for pin `n`.
    pub fn pin(&self, n: u8) -> Result<Pin<'_, R>, GpioError> {
        let pins = Pins::pin(n).ok_or(GpioError::InvalidPin { pin: n })?;
        Ok(Pin { port: self, pins })
    }
}

/// A single pin borrowed from a [`GpioPort`].
pub struct Pin<'a, R> {
    port: &'a GpioPort<R>,
    pins: Pins,
}

impl<R: Registers> Pin<'_, R> {
    /// Mask of this pin.
    pub fn mask(&self) -> Pins {
        self.pins
    }
}

impl<R: Registers> embedded_hal::digital::ErrorType for Pin<'_, R> {
    type Error = Infallible;
}

impl<R: Registers> embedded_hal::digital::OutputPin for Pin<'_, R> {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.port.write(self.pins, PinState::Low);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.port.write(self.pins, PinState::High);
        Ok(())
    }
}

impl<R: Registers> embedded_hal::digital::StatefulOutputPin for Pin<'_, R> {
    fn is_set_high(&mut self) -> Result<bool, Infallible> {
        Ok(self.port.output_state(self.pins).into())
    }

    fn is_set_low(&mut self) -> Result<bool, Infallible> {
        Ok(self.port.output_state(self.pins) == PinState::Low)
    }

    fn toggle(&mut self) -> Result<(), Infallible> {
        self.port.toggle(self.pins);
        Ok(())
    }
}

impl<R: Registers> embedded_hal::digital::InputPin for Pin<'_, R> {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(self.port.read(self.pins).into())
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        Ok(self.port.read(self.pins) == PinState::Low)
    }
}
