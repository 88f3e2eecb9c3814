//! Memory-mapped register access.
//!
//! Every driver in this crate talks to hardware through the [`Registers`]
//! trait: a byte-offset view over one peripheral's register block. On target
//! the implementation is [`Mmio`] (volatile loads and stores at a fixed base
//! address); on the host it is one of the test doubles in `mocks`.
//!
//! Register state is process-wide hardware state. Nothing here caches a copy:
//! every accessor reaches the live register.
//!
//! # Access width
//!
//! STM32 peripheral registers can be accessed as a byte, halfword or word and
//! for some registers (SPI `DR`) the width of the access is observable. The
//! `*_u8` / `*_u16` methods perform an access of exactly that width.

/// Byte-offset access to one peripheral's register block.
///
/// Methods take `&self`: the registers are hardware state shared with
/// interrupt handlers, not memory owned by the caller.
pub trait Registers {
    /// 32-bit read at `offset` bytes from the block base.
    fn read(&self, offset: usize) -> u32;

    /// 32-bit write at `offset` bytes from the block base.
    fn write(&self, offset: usize, value: u32);

    /// 16-bit read at `offset`.
    #[allow(clippy::cast_possible_truncation)] // low halfword on a little-endian bus
    fn read_u16(&self, offset: usize) -> u16 {
        self.read(offset) as u16
    }

    /// 16-bit write at `offset`.
    fn write_u16(&self, offset: usize, value: u16) {
        self.write(offset, u32::from(value));
    }

    /// 8-bit read at `offset`.
    #[allow(clippy::cast_possible_truncation)] // low byte on a little-endian bus
    fn read_u8(&self, offset: usize) -> u8 {
        self.read(offset) as u8
    }

    /// 8-bit write at `offset`.
    fn write_u8(&self, offset: usize, value: u8) {
        self.write(offset, u32::from(value));
    }

    /// Read-modify-write of a 32-bit register.
    ///
    /// The read and the write happen inside one critical section so an
    /// interrupt handler touching the same register cannot slip in between
    /// and have its update overwritten.
    fn modify<F>(&self, offset: usize, f: F)
    where
        F: FnOnce(u32) -> u32,
    {
        critical_section::with(|_| {
            let value = self.read(offset);
            self.write(offset, f(value));
        });
    }

    /// Set every bit of `mask` in the register at `offset`.
    fn set_bits(&self, offset: usize, mask: u32) {
        self.modify(offset, |r| r | mask);
    }

    /// Clear every bit of `mask` in the register at `offset`.
    fn clear_bits(&self, offset: usize, mask: u32) {
        self.modify(offset, |r| r & !mask);
    }

    /// Replace the bits selected by `mask` with `value & mask`.
    fn write_field(&self, offset: usize, mask: u32, value: u32) {
        self.modify(offset, |r| (r & !mask) | (value & mask));
    }

    /// `true` if any bit of `mask` is set.
    fn is_set(&self, offset: usize, mask: u32) -> bool {
        self.read(offset) & mask != 0
    }
}

impl<R: Registers + ?Sized> Registers for &R {
    fn read(&self, offset: usize) -> u32 {
        (**self).read(offset)
    }

    fn write(&self, offset: usize, value: u32) {
        (**self).write(offset, value);
    }

    fn read_u16(&self, offset: usize) -> u16 {
        (**self).read_u16(offset)
    }

    fn write_u16(&self, offset: usize, value: u16) {
        (**self).write_u16(offset, value);
    }

    fn read_u8(&self, offset: usize) -> u8 {
        (**self).read_u8(offset)
    }

    fn write_u8(&self, offset: usize, value: u8) {
        (**self).write_u8(offset, value);
    }
}

/// Volatile register block at a fixed physical address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Mmio {
    base: usize,
}

impl Mmio {
    /// Wrap the register block starting at `base`.
    ///
    /// # Safety
    ///
    /// `base` must be the address of a peripheral register block (see
    /// [`crate::memory_map`]) that stays mapped for the life of the program,
    /// and every offset later passed to the accessors must lie inside it.
    #[must_use]
    pub const unsafe fn new(base: usize) -> Self {
        Self { base }
    }

    /// Base address of the block.
    pub const fn base(&self) -> usize {
        self.base
    }

    #[allow(clippy::arithmetic_side_effects)] // Safety: offsets are small constants inside a 1 KB block
    fn addr(&self, offset: usize) -> usize {
        self.base + offset
    }
}

impl Registers for Mmio {
    fn read(&self, offset: usize) -> u32 {
        // SAFETY: the constructor contract guarantees the address is a mapped
        // register; volatile keeps the access from being elided or merged.
        unsafe { core::ptr::read_volatile(self.addr(offset) as *const u32) }
    }

    fn write(&self, offset: usize, value: u32) {
        // SAFETY: see `read`.
        unsafe { core::ptr::write_volatile(self.addr(offset) as *mut u32, value) }
    }

    fn read_u16(&self, offset: usize) -> u16 {
        // SAFETY: see `read`; a halfword access to a word register is legal on
        // the APB/AHB peripherals of this family.
        unsafe { core::ptr::read_volatile(self.addr(offset) as *const u16) }
    }

    fn write_u16(&self, offset: usize, value: u16) {
        // SAFETY: see `read_u16`.
        unsafe { core::ptr::write_volatile(self.addr(offset) as *mut u16, value) }
    }

    fn read_u8(&self, offset: usize) -> u8 {
        // SAFETY: see `read`; little-endian, so the low byte sits at `offset`.
        unsafe { core::ptr::read_volatile(self.addr(offset) as *const u8) }
    }

    fn write_u8(&self, offset: usize, value: u8) {
        // SAFETY: see `read_u8`.
        unsafe { core::ptr::write_volatile(self.addr(offset) as *mut u8, value) }
    }
}
