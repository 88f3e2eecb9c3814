//! Register-level test doubles
//!
//! These stand in for [`Mmio`](crate::register::Mmio) so the drivers can be
//! exercised on the host. Built for unit tests and behind the `std` feature
//! for integration tests; firmware builds never see them.
//!
//! - [`FakeRegisters`]: plain word-addressed memory with a write log. Good
//!   enough for GPIO, EXTI, SYSCFG and NVIC, whose registers have no read side
//!   effects the drivers depend on.
//! - [`FakeSpi`]: models the SPI status/data register coupling: reading `DR`
//!   pops the receive queue (clearing RXNE once it is empty), every `DR` write
//!   is logged together with its access width, and TXE/BSY are under test
//!   control.

#![cfg(any(test, feature = "std"))]

use core::cell::{Cell, RefCell};

use heapless::{Deque, Vec};

use crate::register::Registers;
use crate::spi::regs::{CR1, CR2, DR, SR, SR_BSY, SR_RXNE, SR_TXE};

/// Capacity of the [`FakeRegisters`] write log.
pub const WRITE_LOG_CAPACITY: usize = 64;

/// Capacity of the [`FakeSpi`] data-register write log.
pub const FRAME_LOG_CAPACITY: usize = 256;

/// Capacity of the [`FakeSpi`] receive queue.
pub const RX_QUEUE_CAPACITY: usize = 64;

/// Width of a bus access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AccessWidth {
    /// 8-bit access
    Byte,
    /// 16-bit access
    HalfWord,
    /// 32-bit access
    Word,
}

// ─── FakeRegisters ───────────────────────────────────────────────────────────

/// `N` words of fake register memory.
///
/// Out-of-range reads return 0 and out-of-range writes are dropped (they are
/// still logged).
pub struct FakeRegisters<const N: usize> {
    words: [Cell<u32>; N],
    writes: RefCell<Vec<(usize, u32), WRITE_LOG_CAPACITY>>,
}

impl<const N: usize> FakeRegisters<N> {
    /// All-zero register block.
    pub fn new() -> Self {
        Self {
            words: core::array::from_fn(|_| Cell::new(0)),
            writes: RefCell::new(Vec::new()),
        }
    }

    /// Current value at `offset`, without logging.
    pub fn get(&self, offset: usize) -> u32 {
        self.word(offset).map_or(0, Cell::get)
    }

    /// Preload `offset` with `value`, as hardware would (e.g. an input data
    /// register). Not logged.
    pub fn set(&self, offset: usize, value: u32) {
        if let Some(word) = self.word(offset) {
            word.set(value);
        }
    }

    /// Every driver write so far, oldest first, as `(offset, value)`.
    pub fn writes(&self) -> Vec<(usize, u32), WRITE_LOG_CAPACITY> {
        self.writes.borrow().clone()
    }

    /// Driver writes to one register, oldest first.
    pub fn writes_to(&self, offset: usize) -> Vec<u32, WRITE_LOG_CAPACITY> {
        self.writes
            .borrow()
            .iter()
            .filter(|(o, _)| *o == offset)
            .map(|(_, v)| *v)
            .collect()
    }

    /// Forget the write log.
    pub fn clear_log(&self) {
        self.writes.borrow_mut().clear();
    }

    fn word(&self, offset: usize) -> Option<&Cell<u32>> {
        if offset % 4 != 0 {
            return None;
        }
        self.words.get(offset / 4)
    }
}

impl<const N: usize> Default for FakeRegisters<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Registers for FakeRegisters<N> {
    fn read(&self, offset: usize) -> u32 {
        self.get(offset)
    }

    fn write(&self, offset: usize, value: u32) {
        // Log full: the test asked for more history than it can inspect.
        let _ = self.writes.borrow_mut().push((offset, value));
        self.set(offset, value);
    }
}

// ─── FakeSpi ─────────────────────────────────────────────────────────────────

/// One access to the SPI data register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DataFrame {
    /// Value written
    pub value: u16,
    /// Width of the store
    pub width: AccessWidth,
}

/// Fake SPI register block.
///
/// Starts like the peripheral after reset: CR1 = CR2 = 0, TXE set, receive
/// queue empty.
pub struct FakeSpi {
    cr1: Cell<u32>,
    cr2: Cell<u32>,
    tx_empty: Cell<bool>,
    busy: Cell<bool>,
    extra_status: Cell<u32>,
    loopback: Cell<bool>,
    dr_reads: Cell<usize>,
    rx: RefCell<Deque<u16, RX_QUEUE_CAPACITY>>,
    frames: RefCell<Vec<DataFrame, FRAME_LOG_CAPACITY>>,
    read_widths: RefCell<Vec<AccessWidth, FRAME_LOG_CAPACITY>>,
}

impl FakeSpi {
    /// Block in its reset state.
    pub fn new() -> Self {
        Self {
            cr1: Cell::new(0),
            cr2: Cell::new(0),
            tx_empty: Cell::new(true),
            busy: Cell::new(false),
            extra_status: Cell::new(0),
            loopback: Cell::new(false),
            dr_reads: Cell::new(0),
            rx: RefCell::new(Deque::new()),
            frames: RefCell::new(Vec::new()),
            read_widths: RefCell::new(Vec::new()),
        }
    }

    /// Block whose MISO is wired to MOSI: every `DR` write is queued for
    /// reception.
    pub fn with_loopback() -> Self {
        let spi = Self::new();
        spi.loopback.set(true);
        spi
    }

    /// Current CR1.
    pub fn cr1(&self) -> u32 {
        self.cr1.get()
    }

    /// Overwrite CR1 behind the driver's back.
    pub fn set_cr1(&self, value: u32) {
        self.cr1.set(value);
    }

    /// Current CR2.
    pub fn cr2(&self) -> u32 {
        self.cr2.get()
    }

    /// Overwrite CR2 behind the driver's back.
    pub fn set_cr2(&self, value: u32) {
        self.cr2.set(value);
    }

    /// Drive the TXE flag.
    pub fn set_tx_empty(&self, empty: bool) {
        self.tx_empty.set(empty);
    }

    /// Drive the BSY flag.
    pub fn set_busy(&self, busy: bool) {
        self.busy.set(busy);
    }

    /// OR extra bits (OVR, MODF, ...) into SR.
    pub fn set_status_bits(&self, bits: u32) {
        self.extra_status.set(bits);
    }

    /// Queue a frame for reception; RXNE reads set while the queue is
    /// non-empty. Returns `false` if the queue is full.
    pub fn push_rx(&self, frame: u16) -> bool {
        self.rx.borrow_mut().push_back(frame).is_ok()
    }

    /// Frames still waiting to be read.
    pub fn rx_pending(&self) -> usize {
        self.rx.borrow().len()
    }

    /// Every data-register store so far, oldest first.
    pub fn frames(&self) -> Vec<DataFrame, FRAME_LOG_CAPACITY> {
        self.frames.borrow().clone()
    }

    /// Values of every data-register store, oldest first.
    pub fn frame_values(&self) -> Vec<u16, FRAME_LOG_CAPACITY> {
        self.frames.borrow().iter().map(|f| f.value).collect()
    }

    /// Widths of every data-register load, oldest first.
    pub fn read_widths(&self) -> Vec<AccessWidth, FRAME_LOG_CAPACITY> {
        self.read_widths.borrow().clone()
    }

    /// Number of data-register loads.
    pub fn dr_reads(&self) -> usize {
        self.dr_reads.get()
    }

    fn status(&self) -> u32 {
        let mut sr = self.extra_status.get();
        if !self.rx.borrow().is_empty() {
            sr |= SR_RXNE;
        }
        if self.tx_empty.get() {
            sr |= SR_TXE;
        }
        if self.busy.get() {
            sr |= SR_BSY;
        }
        sr
    }

    fn load_data(&self, width: AccessWidth) -> u16 {
        self.dr_reads.set(self.dr_reads.get().wrapping_add(1));
        let _ = self.read_widths.borrow_mut().push(width);
        self.rx.borrow_mut().pop_front().unwrap_or(0)
    }

    fn store_data(&self, value: u16, width: AccessWidth) {
        let _ = self.frames.borrow_mut().push(DataFrame { value, width });
        if self.loopback.get() {
            let _ = self.rx.borrow_mut().push_back(value);
        }
    }
}

impl Default for FakeSpi {
    fn default() -> Self {
        Self::new()
    }
}

impl Registers for FakeSpi {
    fn read(&self, offset: usize) -> u32 {
        match offset {
            CR1 => self.cr1.get(),
            CR2 => self.cr2.get(),
            SR => self.status(),
            DR => u32::from(self.load_data(AccessWidth::Word)),
            _ => 0,
        }
    }

    #[allow(clippy::cast_possible_truncation)] // DR is 16 bits wide
    fn write(&self, offset: usize, value: u32) {
        match offset {
            CR1 => self.cr1.set(value),
            CR2 => self.cr2.set(value),
            DR => self.store_data(value as u16, AccessWidth::Word),
            // SR flags are hardware-owned.
            _ => {}
        }
    }

    #[allow(clippy::cast_possible_truncation)] // control registers are 16 bits wide
    fn read_u16(&self, offset: usize) -> u16 {
        match offset {
            DR => self.load_data(AccessWidth::HalfWord),
            _ => self.read(offset) as u16,
        }
    }

    fn write_u16(&self, offset: usize, value: u16) {
        match offset {
            DR => self.store_data(value, AccessWidth::HalfWord),
            _ => self.write(offset, u32::from(value)),
        }
    }

    #[allow(clippy::cast_possible_truncation)] // byte access returns the low byte
    fn read_u8(&self, offset: usize) -> u8 {
        match offset {
            DR => self.load_data(AccessWidth::Byte) as u8,
            _ => self.read(offset) as u8,
        }
    }

    fn write_u8(&self, offset: usize, value: u8) {
        match offset {
            DR => self.store_data(u16::from(value), AccessWidth::Byte),
            _ => self.write(offset, u32::from(value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_registers_log_writes_in_order() {
        let regs = FakeRegisters::<8>::new();
        regs.write(0x18, 1);
        regs.write(0x1C, 2);
        regs.write(0x18, 3);

        assert_eq!(regs.writes_to(0x18).as_slice(), &[1, 3]);
        assert_eq!(regs.writes().len(), 3);
        assert_eq!(regs.get(0x18), 3);
    }

    #[test]
    fn fake_registers_ignore_out_of_range() {
        let regs = FakeRegisters::<2>::new();
        regs.write(0x40, 0xDEAD);
        assert_eq!(regs.read(0x40), 0);
    }

    #[test]
    fn reading_dr_clears_rxne_once_queue_drains() {
        let spi = FakeSpi::new();
        assert!(spi.push_rx(0xAB));
        assert_ne!(spi.read(SR) & SR_RXNE, 0);

        assert_eq!(spi.read_u8(DR), 0xAB);
        assert_eq!(spi.read(SR) & SR_RXNE, 0);
        assert_eq!(spi.read_widths().as_slice(), &[AccessWidth::Byte]);
    }

    #[test]
    fn loopback_queues_written_frames() {
        let spi = FakeSpi::with_loopback();
        spi.write_u16(DR, 0x1234);
        assert_eq!(spi.rx_pending(), 1);
        assert_eq!(spi.read_u16(DR), 0x1234);
        assert_eq!(
            spi.frames().as_slice(),
            &[DataFrame {
                value: 0x1234,
                width: AccessWidth::HalfWord
            }]
        );
    }

    #[test]
    fn reset_state_reports_tx_empty_only() {
        let spi = FakeSpi::new();
        assert_eq!(spi.read(SR), SR_TXE);
    }
}
