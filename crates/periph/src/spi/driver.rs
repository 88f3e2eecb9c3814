//! SPI peripheral handle and interrupt-driven transfer engine.
//!
//! # Lifecycle of a transfer
//!
//! 1. [`Spi::submit_transmit`] / [`Spi::submit_receive`] check the direction is
//!    free, read the live frame width, fill in the descriptor and only then
//!    set TXEIE / RXNEIE.
//! 2. Every SPI interrupt lands in [`Spi::on_interrupt`], which runs a
//!    direction's step only when its enable bit *and* its status flag are
//!    both set.
//! 3. The step that moves the last frame clears the enable bit, resets the
//!    descriptor to [`BusState::Free`] and calls the completion handler.
//!
//! Nothing outside the handle ever writes a descriptor. Shared between the
//! foreground and the ISR, the handle lives in a
//! [`SharedSpi`](crate::spi::SharedSpi) and each side takes it for the
//! duration of one call inside a critical section.

use core::sync::atomic::{compiler_fence, Ordering};

use crate::register::Registers;
use crate::spi::config::{FrameWidth, SpiConfig};
use crate::spi::error::SpiError;
use crate::spi::flag::{flag_status, Flag, FlagStatus};
use crate::spi::regs::{SpiRegs, CR1_SPE, CR2_RXNEIE, CR2_TXEIE, SR_RXNE, SR_TXE};
use crate::spi::transfer::{BusState, Direction, Transfer};

/// Called from interrupt context when a direction finishes.
pub type CompletionHandler = fn(Direction);

/// One SPI peripheral.
///
/// `'buf` is how long submitted buffers stay borrowed: a transmit buffer is
/// released when its transfer completes, a receive buffer is parked until
/// [`take_received`](Self::take_received).
pub struct Spi<'buf, R> {
    regs: SpiRegs<R>,
    config: SpiConfig,
    tx: Transfer<&'buf [u8]>,
    rx: Transfer<&'buf mut [u8]>,
    received: Option<&'buf mut [u8]>,
    on_complete: Option<CompletionHandler>,
}

impl<'buf, R: Registers> Spi<'buf, R> {
    /// Configure the peripheral and return an idle handle.
    ///
    /// CR1 is written from `config` with SPE clear; TXEIE and RXNEIE are
    /// cleared so no stale enable survives into the fresh descriptors. Call
    /// [`set_enabled`](Self::set_enabled) to start the peripheral.
    pub fn init(regs: R, config: SpiConfig) -> Self {
        let regs = SpiRegs::new(regs);
        regs.disarm(CR2_TXEIE | CR2_RXNEIE);
        regs.write_cr1_config(config.cr1());

        #[cfg(feature = "defmt")]
        defmt::debug!("spi: init cr1={=u32:#x}", config.cr1());

        Self {
            regs,
            config,
            tx: Transfer::idle(),
            rx: Transfer::idle(),
            received: None,
            on_complete: None,
        }
    }

    /// Set or clear CR1.SPE.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.regs.set_spe(enabled);
    }

    /// `true` if CR1.SPE is set.
    pub fn is_enabled(&self) -> bool {
        self.regs.cr1() & CR1_SPE != 0
    }

    /// Re-apply a configuration, leaving the peripheral enabled if it was.
    ///
    /// DFF and BR may only change with SPE clear, so an enabled peripheral
    /// is stopped for the CR1 rewrite and started again afterwards.
    ///
    /// Refused while either direction has a transfer in flight: the step
    /// width of a running transfer is already bound and a DFF change under
    /// it would desynchronise the data register access width.
    pub fn configure(&mut self, config: SpiConfig) -> Result<(), SpiError> {
        if self.is_busy() {
            return Err(SpiError::Busy);
        }
        let was_enabled = self.is_enabled();
        if was_enabled {
            self.regs.set_spe(false);
        }
        self.regs.write_cr1_config(config.cr1());
        if was_enabled {
            self.regs.set_spe(true);
        }
        self.config = config;
        Ok(())
    }

    /// Configuration last applied by [`init`](Self::init) or
    /// [`configure`](Self::configure).
    pub fn config(&self) -> &SpiConfig {
        &self.config
    }

    /// Register block this handle drives.
    pub fn registers(&self) -> &R {
        self.regs.inner()
    }

    pub(super) fn regs(&self) -> &SpiRegs<R> {
        &self.regs
    }

    /// Install or remove the completion handler.
    ///
    /// The handler runs inside [`on_interrupt`](Self::on_interrupt), after the
    /// descriptor is back to [`BusState::Free`]; keep it short.
    pub fn set_completion_handler(&mut self, handler: Option<CompletionHandler>) {
        self.on_complete = handler;
    }

    // ── Submit ─────────────────────────────────────────────────────────────

    /// Start an interrupt-driven transmit of `data`.
    ///
    /// `data.len()` must be a non-zero whole number of frames at the live
    /// CR1.DFF width. On rejection nothing changes: the in-flight transfer,
    /// if any, keeps its buffer, cursor and remaining count.
    pub fn submit_transmit(&mut self, data: &'buf [u8]) -> Result<(), SpiError> {
        if self.tx.state() == BusState::Busy {
            #[cfg(feature = "defmt")]
            defmt::warn!("spi: transmit rejected, busy");
            return Err(SpiError::Busy);
        }
        let width = self.regs.frame_width();
        let len = data.len();
        if !width.accepts(len) {
            return Err(SpiError::InvalidLength { len });
        }

        self.tx.begin(data, len, width);
        // Descriptor stores must not sink below the enable-bit write.
        compiler_fence(Ordering::SeqCst);
        self.regs.arm(CR2_TXEIE);

        #[cfg(feature = "defmt")]
        defmt::trace!("spi: tx armed, {=usize} bytes", len);
        Ok(())
    }

    /// Start an interrupt-driven receive into `buf`.
    ///
    /// Same rules as [`submit_transmit`](Self::submit_transmit). The filled
    /// buffer is handed back by [`take_received`](Self::take_received).
    pub fn submit_receive(&mut self, buf: &'buf mut [u8]) -> Result<(), SpiError> {
        if self.rx.state() == BusState::Busy {
            #[cfg(feature = "defmt")]
            defmt::warn!("spi: receive rejected, busy");
            return Err(SpiError::Busy);
        }
        let width = self.regs.frame_width();
        let len = buf.len();
        if !width.accepts(len) {
            return Err(SpiError::InvalidLength { len });
        }

        self.rx.begin(buf, len, width);
        compiler_fence(Ordering::SeqCst);
        self.regs.arm(CR2_RXNEIE);

        #[cfg(feature = "defmt")]
        defmt::trace!("spi: rx armed, {=usize} bytes", len);
        Ok(())
    }

    /// Most recently completed receive buffer, if not already taken.
    ///
    /// A receive that completes before the previous buffer was taken
    /// replaces it.
    pub fn take_received(&mut self) -> Option<&'buf mut [u8]> {
        self.received.take()
    }

    // ── Interrupt dispatch ─────────────────────────────────────────────────

    /// SPI interrupt entry point. Call from the peripheral's vector.
    ///
    /// Transmit and receive are gated independently on (enable bit AND
    /// status flag), so one call may service both in full duplex.
    pub fn on_interrupt(&mut self) {
        if self.regs.is_armed(CR2_TXEIE) && self.regs.sr() & SR_TXE != 0 {
            match self.tx.step() {
                Some(FrameWidth::Bits8) => self.tx_step8(),
                Some(FrameWidth::Bits16) => self.tx_step16(),
                // Armed from outside the driver: nothing to send.
                None => self.regs.disarm(CR2_TXEIE),
            }
        }
        if self.regs.is_armed(CR2_RXNEIE) && self.regs.sr() & SR_RXNE != 0 {
            match self.rx.step() {
                Some(FrameWidth::Bits8) => self.rx_step8(),
                Some(FrameWidth::Bits16) => self.rx_step16(),
                None => self.regs.disarm(CR2_RXNEIE),
            }
        }
    }

    fn tx_step8(&mut self) {
        let Some(byte) = self.tx.peek8() else {
            self.close_tx();
            return;
        };
        self.regs.write_dr8(byte);
        if self.tx.advance(FrameWidth::Bits8) {
            self.close_tx();
        }
    }

    fn tx_step16(&mut self) {
        let Some(frame) = self.tx.peek16() else {
            self.close_tx();
            return;
        };
        self.regs.write_dr16(frame);
        if self.tx.advance(FrameWidth::Bits16) {
            self.close_tx();
        }
    }

    fn rx_step8(&mut self) {
        // Read unconditionally: the DR load is what clears RXNE.
        let byte = self.regs.read_dr8();
        if !self.rx.put8(byte) || self.rx.advance(FrameWidth::Bits8) {
            self.close_rx();
        }
    }

    fn rx_step16(&mut self) {
        let frame = self.regs.read_dr16();
        if !self.rx.put16(frame) || self.rx.advance(FrameWidth::Bits16) {
            self.close_rx();
        }
    }

    fn close_tx(&mut self) {
        self.regs.disarm(CR2_TXEIE);
        self.tx.finish();
        #[cfg(feature = "defmt")]
        defmt::trace!("spi: tx complete");
        self.notify(Direction::Transmit);
    }

    fn close_rx(&mut self) {
        self.regs.disarm(CR2_RXNEIE);
        if let Some(buf) = self.rx.finish() {
            self.received = Some(buf);
        }
        #[cfg(feature = "defmt")]
        defmt::trace!("spi: rx complete");
        self.notify(Direction::Receive);
    }

    fn notify(&self, direction: Direction) {
        if let Some(handler) = self.on_complete {
            handler(direction);
        }
    }

    // ── Status ─────────────────────────────────────────────────────────────

    /// Transmit descriptor state.
    pub fn tx_state(&self) -> BusState {
        self.tx.state()
    }

    /// Receive descriptor state.
    pub fn rx_state(&self) -> BusState {
        self.rx.state()
    }

    /// `true` while either direction has a transfer in flight.
    pub fn is_busy(&self) -> bool {
        self.tx.state() == BusState::Busy || self.rx.state() == BusState::Busy
    }

    /// Bytes left to transmit.
    pub fn tx_remaining(&self) -> usize {
        self.tx.remaining()
    }

    /// Bytes left to receive.
    pub fn rx_remaining(&self) -> usize {
        self.rx.remaining()
    }

    /// Step width bound to the transmit descriptor, `None` when free.
    pub fn tx_step(&self) -> Option<FrameWidth> {
        self.tx.step()
    }

    /// Step width bound to the receive descriptor, `None` when free.
    pub fn rx_step(&self) -> Option<FrameWidth> {
        self.rx.step()
    }

    /// Live value of one SR flag.
    pub fn flag_status(&self, flag: Flag) -> FlagStatus {
        flag_status(&self.regs, flag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{FakeRegisters, FakeSpi};
    use crate::spi::regs::{CR1, CR1_DFF};

    #[test]
    fn init_leaves_spe_clear_and_interrupts_disarmed() {
        let fake = FakeSpi::new();
        fake.set_cr1(CR1_SPE);
        fake.set_cr2(CR2_TXEIE | CR2_RXNEIE);

        let spi = Spi::init(&fake, SpiConfig::DEFAULT);
        assert!(!spi.is_enabled());
        assert_eq!(fake.cr2() & (CR2_TXEIE | CR2_RXNEIE), 0);
        assert_eq!(spi.tx_state(), BusState::Free);
        assert_eq!(spi.rx_state(), BusState::Free);
    }

    #[test]
    fn configure_rewrites_cr1_with_spe_clear_then_restarts() {
        let regs = FakeRegisters::<4>::new();
        let mut spi = Spi::init(&regs, SpiConfig::DEFAULT);
        spi.set_enabled(true);
        regs.clear_log();

        let wide = SpiConfig::DEFAULT.with_frame_width(FrameWidth::Bits16);
        assert_eq!(spi.configure(wide), Ok(()));

        let cr1 = regs.writes_to(CR1);
        // Stop, rewrite, restart.
        assert_eq!(cr1.len(), 3);
        assert!(cr1.iter().all(|&v| v & CR1_SPE == 0 || v & CR1_DFF != 0));
        assert_eq!(cr1.first().map(|&v| v & (CR1_SPE | CR1_DFF)), Some(0));
        assert_eq!(cr1.get(1).map(|&v| v & (CR1_SPE | CR1_DFF)), Some(CR1_DFF));
        assert_eq!(cr1.last(), Some(&(wide.cr1() | CR1_SPE)));
        assert!(spi.is_enabled());
    }

    #[test]
    fn configure_leaves_a_stopped_peripheral_stopped() {
        let regs = FakeRegisters::<4>::new();
        let mut spi = Spi::init(&regs, SpiConfig::DEFAULT);
        regs.clear_log();

        let wide = SpiConfig::DEFAULT.with_frame_width(FrameWidth::Bits16);
        assert_eq!(spi.configure(wide), Ok(()));
        assert_eq!(regs.writes_to(CR1).as_slice(), &[wide.cr1()]);
        assert!(!spi.is_enabled());
    }

    #[test]
    fn configure_refuses_while_busy() {
        let fake = FakeSpi::new();
        let wide = SpiConfig::DEFAULT.with_frame_width(FrameWidth::Bits16);
        let mut spi = Spi::init(&fake, wide);

        assert_eq!(spi.submit_transmit(&[1, 2]), Ok(()));
        assert_eq!(spi.configure(SpiConfig::DEFAULT), Err(SpiError::Busy));
        assert_eq!(spi.config(), &wide);
        assert_ne!(fake.cr1() & CR1_DFF, 0);
    }

    #[test]
    fn stray_enable_without_descriptor_is_disarmed() {
        let fake = FakeSpi::new();
        let mut spi = Spi::init(&fake, SpiConfig::DEFAULT);
        fake.set_cr2(CR2_TXEIE);

        spi.on_interrupt();
        assert_eq!(fake.cr2() & CR2_TXEIE, 0);
        assert!(fake.frames().is_empty());
    }

    #[test]
    fn empty_submission_is_rejected() {
        let fake = FakeSpi::new();
        let mut spi = Spi::init(&fake, SpiConfig::DEFAULT);
        assert_eq!(
            spi.submit_transmit(&[]),
            Err(SpiError::InvalidLength { len: 0 })
        );
        assert_eq!(fake.cr2(), 0);
    }
}
