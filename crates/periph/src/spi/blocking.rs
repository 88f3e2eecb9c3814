//! Polled transfers and the `embedded-hal` bus traits.
//!
//! These paths never touch CR2: they spin on SR and move one frame per
//! iteration with the same width rule as the interrupt steps. Every wait is
//! bounded by [`SpiConfig::poll_limit`](crate::spi::SpiConfig::poll_limit).
//!
//! Overrun is not checked on receive. See DESIGN.md.

use embedded_hal::spi::{ErrorType, SpiBus};

use crate::register::Registers;
use crate::spi::config::{FrameWidth, PollLimit};
use crate::spi::driver::Spi;
use crate::spi::error::SpiError;
use crate::spi::flag::{flag_status, Flag, FlagStatus};
use crate::spi::regs::SpiRegs;
use crate::spi::transfer::BusState;

mod sealed {
    pub trait Sealed {}
    impl Sealed for u8 {}
    impl Sealed for u16 {}
}

/// Word type the bus traits can move: `u8` for 8-bit frames, `u16` for
/// 16-bit frames.
pub trait DataWord: sealed::Sealed + Copy + Default + 'static {
    /// Frame width this word type requires in CR1.DFF.
    const WIDTH: FrameWidth;

    #[doc(hidden)]
    fn store<R: Registers>(self, regs: &SpiRegs<R>);

    #[doc(hidden)]
    fn load<R: Registers>(regs: &SpiRegs<R>) -> Self;
}

impl DataWord for u8 {
    const WIDTH: FrameWidth = FrameWidth::Bits8;

    fn store<R: Registers>(self, regs: &SpiRegs<R>) {
        regs.write_dr8(self);
    }

    fn load<R: Registers>(regs: &SpiRegs<R>) -> Self {
        regs.read_dr8()
    }
}

impl DataWord for u16 {
    const WIDTH: FrameWidth = FrameWidth::Bits16;

    fn store<R: Registers>(self, regs: &SpiRegs<R>) {
        regs.write_dr16(self);
    }

    fn load<R: Registers>(regs: &SpiRegs<R>) -> Self {
        regs.read_dr16()
    }
}

impl<R: Registers> Spi<'_, R> {
    /// Transmit `data`, spinning on TXE before each frame and on BSY at the
    /// end so the last frame has left the shifter when this returns.
    ///
    /// Frames follow the live CR1.DFF; 16-bit frames are little-endian pairs
    /// of `data`. An empty `data` only waits for BSY to clear.
    pub fn transmit(&mut self, data: &[u8]) -> Result<(), SpiError> {
        if self.tx_state() == BusState::Busy {
            return Err(SpiError::Busy);
        }
        let width = self.regs().frame_width();
        if !data.is_empty() && !width.accepts(data.len()) {
            return Err(SpiError::InvalidLength { len: data.len() });
        }

        for frame in data.chunks_exact(width.bytes()) {
            self.wait_for(Flag::TxEmpty, FlagStatus::Set)?;
            match *frame {
                [byte] => self.regs().write_dr8(byte),
                [lo, hi] => self.regs().write_dr16(u16::from_le_bytes([lo, hi])),
                _ => {}
            }
        }
        self.flush_bus()
    }

    /// Fill `buf`, spinning on RXNE before each frame.
    ///
    /// Nothing is transmitted: in master full-duplex mode something else has
    /// to clock the bus (or use [`SpiBus::read`], which sends zeros).
    pub fn receive(&mut self, buf: &mut [u8]) -> Result<(), SpiError> {
        if self.rx_state() == BusState::Busy {
            return Err(SpiError::Busy);
        }
        let width = self.regs().frame_width();
        if buf.is_empty() {
            return Ok(());
        }
        if !width.accepts(buf.len()) {
            return Err(SpiError::InvalidLength { len: buf.len() });
        }

        for frame in buf.chunks_exact_mut(width.bytes()) {
            self.wait_for(Flag::RxNotEmpty, FlagStatus::Set)?;
            match frame {
                [byte] => *byte = self.regs().read_dr8(),
                [lo, hi] => [*lo, *hi] = self.regs().read_dr16().to_le_bytes(),
                _ => {}
            }
        }
        Ok(())
    }

    /// Send one word and return the word clocked in at the same time.
    pub fn exchange<W: DataWord>(&mut self, word: W) -> Result<W, SpiError> {
        self.wait_for(Flag::TxEmpty, FlagStatus::Set)?;
        word.store(self.regs());
        self.wait_for(Flag::RxNotEmpty, FlagStatus::Set)?;
        Ok(W::load(self.regs()))
    }

    fn claim_bus<W: DataWord>(&self) -> Result<(), SpiError> {
        if self.is_busy() {
            return Err(SpiError::Busy);
        }
        if self.regs().frame_width() != W::WIDTH {
            return Err(SpiError::WordSize);
        }
        Ok(())
    }

    /// Wait for the holding register to drain and the shifter to go idle.
    fn flush_bus(&self) -> Result<(), SpiError> {
        self.wait_for(Flag::TxEmpty, FlagStatus::Set)?;
        self.wait_for(Flag::Busy, FlagStatus::Reset)
    }

    fn wait_for(&self, flag: Flag, status: FlagStatus) -> Result<(), SpiError> {
        let mut spins: u32 = 0;
        loop {
            if flag_status(self.regs(), flag) == status {
                return Ok(());
            }
            if let PollLimit::Spins(limit) = self.config().poll_limit {
                if spins >= limit {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("spi: timeout waiting on {}", flag);
                    return Err(SpiError::Timeout { flag });
                }
                spins = spins.saturating_add(1);
            }
            core::hint::spin_loop();
        }
    }
}

impl<R: Registers> ErrorType for Spi<'_, R> {
    type Error = SpiError;
}

impl<R: Registers, W: DataWord> SpiBus<W> for Spi<'_, R> {
    fn read(&mut self, words: &mut [W]) -> Result<(), SpiError> {
        self.claim_bus::<W>()?;
        for word in words.iter_mut() {
            *word = self.exchange(W::default())?;
        }
        Ok(())
    }

    fn write(&mut self, words: &[W]) -> Result<(), SpiError> {
        self.claim_bus::<W>()?;
        for &word in words {
            self.exchange(word)?;
        }
        Ok(())
    }

    fn transfer(&mut self, read: &mut [W], write: &[W]) -> Result<(), SpiError> {
        self.claim_bus::<W>()?;
        let len = read.len().max(write.len());
        for i in 0..len {
            let out = write.get(i).copied().unwrap_or_default();
            let word = self.exchange(out)?;
            if let Some(slot) = read.get_mut(i) {
                *slot = word;
            }
        }
        Ok(())
    }

    fn transfer_in_place(&mut self, words: &mut [W]) -> Result<(), SpiError> {
        self.claim_bus::<W>()?;
        for word in words.iter_mut() {
            *word = self.exchange(*word)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SpiError> {
        if self.is_busy() {
            return Err(SpiError::Busy);
        }
        self.flush_bus()
    }
}
