//! Handle shared between the foreground and the SPI interrupt handler.

use core::cell::RefCell;

use critical_section::Mutex;

use crate::register::Registers;
use crate::spi::driver::Spi;

/// An [`Spi`] that lives in a `static` and is reached from both contexts.
///
/// Every access runs inside `critical_section::with`, so the ISR can never
/// observe a descriptor half-written by a submit call, and a submit call can
/// never race a step function closing the same descriptor.
///
/// ```ignore
/// static SPI1: SharedSpi<'static, Mmio> = SharedSpi::new();
///
/// #[interrupt]
/// fn SPI1() {
///     SPI1.on_interrupt();
/// }
/// ```
pub struct SharedSpi<'buf, R> {
    inner: Mutex<RefCell<Option<Spi<'buf, R>>>>,
}

impl<'buf, R: Registers> SharedSpi<'buf, R> {
    /// Empty slot; [`install`](Self::install) a handle before use.
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(None)),
        }
    }

    /// Place `spi` in the slot, returning whatever was there.
    pub fn install(&self, spi: Spi<'buf, R>) -> Option<Spi<'buf, R>> {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).replace(spi))
    }

    /// Remove the handle.
    pub fn take(&self) -> Option<Spi<'buf, R>> {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).take())
    }

    /// Run `f` on the handle inside a critical section.
    ///
    /// Returns `None` if nothing is installed.
    pub fn with<T>(&self, f: impl FnOnce(&mut Spi<'buf, R>) -> T) -> Option<T> {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).as_mut().map(f))
    }

    /// Forward the interrupt to the installed handle, if any.
    pub fn on_interrupt(&self) {
        self.with(Spi::on_interrupt);
    }
}

impl<R: Registers> Default for SharedSpi<'_, R> {
    fn default() -> Self {
        Self::new()
    }
}
