//! Register-level drivers for the STM32F407 GPIO, EXTI/NVIC and SPI blocks
//!
//! Every driver is generic over [`Registers`], a byte-offset view of one
//! peripheral's register block. On target that is [`Mmio`]; on the host it
//! is one of the doubles in `mocks` (`std` feature), so the whole crate is
//! testable without silicon.
//!
//! # Layers
//!
//! ```text
//! Application (ISR vectors, board bring-up)
//!         ↓
//! spi::SharedSpi ─ spi::Spi ─ gpio::GpioPort ─ exti::Exti ─ nvic::Nvic
//!         ↓
//! register::Registers (Mmio | mocks)
//!         ↓
//! Hardware
//! ```
//!
//! # Features
//!
//! - `hardware`: single-core `critical-section` implementation from `cortex-m`
//! - `defmt`: `defmt::Format` derives and log sites
//! - `std`: register test doubles in `mocks` (host testing)
//!
//! # Example
//!
//! ```ignore
//! use periph::memory_map::SPI1_BASE;
//! use periph::spi::{SharedSpi, Spi, SpiConfig};
//! use periph::Mmio;
//!
//! static SPI1: SharedSpi<'static, Mmio> = SharedSpi::new();
//! static FRAME: [u8; 4] = [0xDE, 0xAD, 0xBE, 0xEF];
//!
//! fn start() -> Result<(), periph::spi::SpiError> {
//!     // SAFETY: SPI1_BASE is the SPI1 register block.
//!     let regs = unsafe { Mmio::new(SPI1_BASE) };
//!     let mut spi = Spi::init(regs, SpiConfig::DEFAULT);
//!     spi.set_enabled(true);
//!     SPI1.install(spi);
//!     SPI1.with(|spi| spi.submit_transmit(&FRAME)).unwrap_or(Ok(()))
//! }
//!
//! #[interrupt]
//! fn SPI1() {
//!     SPI1.on_interrupt();
//! }
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)] // no unreachable!() that isn't documented
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)] // unsafe fn body is not implicitly unsafe block
#![warn(clippy::print_stdout)] // prefer defmt over println! in lib code
// Pedantic lints suppressed for this register-level crate:
#![allow(clippy::doc_markdown)] // hex addresses and register names in doc comments
#![allow(clippy::must_use_candidate)] // hardware accessors: callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::cast_lossless)] // `as` widening inside const fns

pub mod exti;
pub mod gpio;
pub mod memory_map;
pub mod mocks;
pub mod nvic;
pub mod register;
pub mod spi;

pub use register::{Mmio, Registers};

// Re-export GPIO types
pub use gpio::{
    AlternateFunction, GpioError, GpioPort, OutputType, Pin, PinConfig, PinMode, PinState, Pins,
    Port, Pull, Speed,
};

// Re-export EXTI / NVIC types
pub use exti::{Exti, ExtiConfig, ExtiError, ExtiMode, Syscfg, Trigger};
pub use nvic::{Irq, Nvic};

// Re-export SPI types
pub use spi::{
    BusState, Direction, Flag, FlagStatus, FrameWidth, SharedSpi, Spi, SpiConfig, SpiError,
};
