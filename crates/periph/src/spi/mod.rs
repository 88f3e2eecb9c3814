//! Serial peripheral interface driver.
//!
//! Two ways to move data:
//!
//! - **Interrupt driven**: [`Spi::submit_transmit`] / [`Spi::submit_receive`]
//!   arm TXEIE / RXNEIE and return; [`Spi::on_interrupt`] moves one frame per
//!   qualifying interrupt and disarms when the buffer is exhausted. Each
//!   direction has its own descriptor, so a transmit and a receive can run at
//!   once.
//! - **Polled**: [`Spi::transmit`], [`Spi::receive`] and the
//!   [`embedded_hal::spi::SpiBus`] impls spin on SR.
//!
//! Frame width is always read from the live CR1.DFF. Buffers are bytes; a
//! 16-bit frame is two bytes, little-endian.

mod blocking;
pub mod config;
mod driver;
mod error;
mod flag;
pub mod regs;
mod shared;
mod transfer;

pub use blocking::DataWord;
pub use config::{
    BaudRate, BitOrder, BusConfig, ClockPhase, ClockPolarity, FrameWidth, PollLimit, Role,
    SpiConfig, SpiMode,
};
pub use driver::{CompletionHandler, Spi};
pub use error::SpiError;
pub use flag::{flag_status, Flag, FlagStatus};
pub use regs::SpiRegs;
pub use shared::SharedSpi;
pub use transfer::{BusState, Direction};
