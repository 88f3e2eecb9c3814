//! Per-direction transfer descriptor.
//!
//! A descriptor borrows the caller's buffer for the life of one interrupt
//! driven transfer and walks it with a plain offset. The step width is bound
//! once, at submission, from the live CR1.DFF and carried as a
//! [`FrameWidth`] tag that the interrupt dispatcher matches on.
//!
//! ```text
//!           begin()                  advance() == true
//!   Free ───────────────► Busy ────────────────────────► finish() ─► Free
//!                          │ ▲
//!                          └─┘ advance() == false (one frame moved)
//! ```

use crate::spi::config::FrameWidth;

/// Occupancy of one transfer direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusState {
    /// Idle, a new transfer may be submitted
    Free,
    /// Transfer in flight
    Busy,
}

/// Transfer direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Memory to DR
    Transmit,
    /// DR to memory
    Receive,
}

/// Runtime state of one direction.
#[derive(Debug)]
pub(crate) struct Transfer<B> {
    state: BusState,
    buffer: Option<B>,
    offset: usize,
    remaining: usize,
    step: Option<FrameWidth>,
}

impl<B> Transfer<B> {
    pub(crate) const fn idle() -> Self {
        Self {
            state: BusState::Free,
            buffer: None,
            offset: 0,
            remaining: 0,
            step: None,
        }
    }

    pub(crate) fn state(&self) -> BusState {
        self.state
    }

    pub(crate) fn remaining(&self) -> usize {
        self.remaining
    }

    pub(crate) fn step(&self) -> Option<FrameWidth> {
        self.step
    }

    /// Take ownership of `buffer` for `len` bytes at `width`.
    ///
    /// The caller has already checked that the direction is free and that
    /// `len` is a whole number of frames.
    pub(crate) fn begin(&mut self, buffer: B, len: usize, width: FrameWidth) {
        self.buffer = Some(buffer);
        self.offset = 0;
        self.remaining = len;
        self.step = Some(width);
        self.state = BusState::Busy;
    }

    /// Account for one moved frame. Returns `true` once nothing remains.
    pub(crate) fn advance(&mut self, width: FrameWidth) -> bool {
        let unit = width.bytes();
        self.offset = self.offset.saturating_add(unit);
        // Saturating: a short final frame ends the transfer instead of
        // wrapping past zero.
        self.remaining = self.remaining.saturating_sub(unit);
        self.remaining == 0
    }

    /// Close the descriptor and hand back the buffer.
    pub(crate) fn finish(&mut self) -> Option<B> {
        self.offset = 0;
        self.remaining = 0;
        self.step = None;
        self.state = BusState::Free;
        self.buffer.take()
    }

    fn window(&self, width: FrameWidth) -> Option<core::ops::Range<usize>> {
        let end = self.offset.checked_add(width.bytes())?;
        Some(self.offset..end)
    }
}

impl<B: AsRef<[u8]>> Transfer<B> {
    /// Byte at the cursor.
    pub(crate) fn peek8(&self) -> Option<u8> {
        self.buffer.as_ref()?.as_ref().get(self.offset).copied()
    }

    /// Little-endian halfword at the cursor.
    pub(crate) fn peek16(&self) -> Option<u16> {
        let range = self.window(FrameWidth::Bits16)?;
        match *self.buffer.as_ref()?.as_ref().get(range)? {
            [lo, hi] => Some(u16::from_le_bytes([lo, hi])),
            _ => None,
        }
    }
}

impl<B: AsMut<[u8]>> Transfer<B> {
    /// Store a byte at the cursor. `false` if the cursor is out of bounds.
    pub(crate) fn put8(&mut self, byte: u8) -> bool {
        let offset = self.offset;
        match self.buffer.as_mut().and_then(|b| b.as_mut().get_mut(offset)) {
            Some(slot) => {
                *slot = byte;
                true
            }
            None => false,
        }
    }

    /// Store a little-endian halfword at the cursor.
    pub(crate) fn put16(&mut self, frame: u16) -> bool {
        let Some(range) = self.window(FrameWidth::Bits16) else {
            return false;
        };
        match self.buffer.as_mut().and_then(|b| b.as_mut().get_mut(range)) {
            Some([lo, hi]) => {
                [*lo, *hi] = frame.to_le_bytes();
                true
            }
            _ => false,
        }
    }
}
