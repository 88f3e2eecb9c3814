//! Interrupt-driven SPI transfers against the register double.
//! Each test plays the ISR by calling `on_interrupt` by hand.

use core::sync::atomic::{AtomicUsize, Ordering};

use periph::mocks::{AccessWidth, FakeSpi};
use periph::spi::regs::{CR1_DFF, CR2_RXNEIE, CR2_TXEIE};
use periph::spi::{BusState, Direction, FrameWidth, Spi, SpiConfig, SpiError};

fn wide() -> SpiConfig {
    SpiConfig::DEFAULT.with_frame_width(FrameWidth::Bits16)
}

// ── Transmit ─────────────────────────────────────────────────────────────────

#[test]
fn eight_bit_transmit_moves_one_byte_per_interrupt() {
    let fake = FakeSpi::new();
    let data = [0x11, 0x22, 0x33, 0x44, 0x55];
    let mut spi = Spi::init(&fake, SpiConfig::DEFAULT);

    assert_eq!(spi.submit_transmit(&data), Ok(()));
    assert_eq!(spi.tx_state(), BusState::Busy);
    assert_eq!(spi.tx_step(), Some(FrameWidth::Bits8));

    for expected_remaining in [4, 3, 2, 1] {
        spi.on_interrupt();
        assert_eq!(spi.tx_remaining(), expected_remaining);
        assert_eq!(spi.tx_state(), BusState::Busy);
    }
    spi.on_interrupt();

    assert_eq!(spi.tx_state(), BusState::Free);
    assert_eq!(spi.tx_remaining(), 0);
    assert_eq!(spi.tx_step(), None);
    assert_eq!(
        fake.frame_values().as_slice(),
        &[0x11, 0x22, 0x33, 0x44, 0x55]
    );
    assert!(fake.frames().iter().all(|f| f.width == AccessWidth::Byte));
}

#[test]
fn sixteen_bit_transmit_counts_down_in_pairs() {
    let fake = FakeSpi::new();
    let data = [0x34, 0x12, 0x78, 0x56];
    let mut spi = Spi::init(&fake, wide());

    assert_eq!(spi.submit_transmit(&data), Ok(()));
    assert_eq!(spi.tx_remaining(), 4);
    spi.on_interrupt();
    assert_eq!(spi.tx_remaining(), 2);
    spi.on_interrupt();
    assert_eq!(spi.tx_remaining(), 0);

    assert_eq!(spi.tx_state(), BusState::Free);
    assert_eq!(fake.frame_values().as_slice(), &[0x1234, 0x5678]);
    assert!(fake.frames().iter().all(|f| f.width == AccessWidth::HalfWord));
}

#[test]
fn completion_clears_the_enable_bit() {
    let fake = FakeSpi::new();
    let data = [1, 2];
    let mut spi = Spi::init(&fake, SpiConfig::DEFAULT);

    assert_eq!(spi.submit_transmit(&data), Ok(()));
    assert_ne!(fake.cr2() & CR2_TXEIE, 0, "submit must arm TXEIE");
    spi.on_interrupt();
    spi.on_interrupt();

    assert_eq!(spi.tx_state(), BusState::Free);
    assert_eq!(fake.cr2() & CR2_TXEIE, 0);

    // TXE is still set; with the enable clear nothing more is written.
    spi.on_interrupt();
    assert_eq!(fake.frames().len(), 2);
}

// ── Busy rejection ───────────────────────────────────────────────────────────

#[test]
fn resubmission_while_busy_leaves_transfer_untouched() {
    let fake = FakeSpi::new();
    let first = [0xA0, 0xA1, 0xA2, 0xA3];
    let second = [0xB0, 0xB1];
    let mut spi = Spi::init(&fake, SpiConfig::DEFAULT);

    assert_eq!(spi.submit_transmit(&first), Ok(()));
    spi.on_interrupt();
    assert_eq!(spi.tx_remaining(), 3);

    assert_eq!(spi.submit_transmit(&second), Err(SpiError::Busy));
    assert_eq!(spi.tx_remaining(), 3);
    assert_eq!(spi.tx_state(), BusState::Busy);

    for _ in 0..3 {
        spi.on_interrupt();
    }
    assert_eq!(fake.frame_values().as_slice(), &[0xA0, 0xA1, 0xA2, 0xA3]);
}

#[test]
fn directions_are_independent() {
    let fake = FakeSpi::new();
    let data = [1, 2];
    let mut buf = [0u8; 2];
    let mut spi = Spi::init(&fake, SpiConfig::DEFAULT);

    assert_eq!(spi.submit_transmit(&data), Ok(()));
    assert_eq!(spi.submit_receive(&mut buf), Ok(()));
    assert_eq!(spi.rx_state(), BusState::Busy);
}

// ── Length checks ────────────────────────────────────────────────────────────

#[test]
fn odd_length_with_sixteen_bit_frames_is_rejected_before_any_write() {
    let fake = FakeSpi::new();
    let data = [1, 2, 3];
    let mut buf = [0u8; 5];
    let mut spi = Spi::init(&fake, wide());

    assert_eq!(
        spi.submit_transmit(&data),
        Err(SpiError::InvalidLength { len: 3 })
    );
    assert_eq!(
        spi.submit_receive(&mut buf),
        Err(SpiError::InvalidLength { len: 5 })
    );
    assert_eq!(spi.tx_state(), BusState::Free);
    assert_eq!(spi.rx_state(), BusState::Free);
    assert_eq!(fake.cr2(), 0);
}

// ── Dispatch gating ──────────────────────────────────────────────────────────

#[test]
fn flag_without_enable_does_not_step() {
    let fake = FakeSpi::new();
    assert!(fake.push_rx(0x99));
    let mut spi = Spi::init(&fake, SpiConfig::DEFAULT);

    // TXE and RXNE both read set, neither enable is.
    spi.on_interrupt();

    assert!(fake.frames().is_empty());
    assert_eq!(fake.dr_reads(), 0);
    assert_eq!(fake.rx_pending(), 1);
}

#[test]
fn enable_without_flag_does_not_step() {
    let fake = FakeSpi::new();
    let data = [1, 2, 3];
    let mut buf = [0u8; 3];
    let mut spi = Spi::init(&fake, SpiConfig::DEFAULT);

    fake.set_tx_empty(false);
    assert_eq!(spi.submit_transmit(&data), Ok(()));
    assert_eq!(spi.submit_receive(&mut buf), Ok(()));

    spi.on_interrupt();

    assert!(fake.frames().is_empty());
    assert_eq!(fake.dr_reads(), 0);
    assert_eq!(spi.tx_remaining(), 3);
    assert_eq!(spi.rx_remaining(), 3);

    fake.set_tx_empty(true);
    spi.on_interrupt();
    assert_eq!(spi.tx_remaining(), 2);
    assert_eq!(spi.rx_remaining(), 3);
}

// ── Width binding ────────────────────────────────────────────────────────────

#[test]
fn step_width_follows_live_dff() {
    let fake = FakeSpi::new();
    let data = [0xCD, 0xAB];
    let mut spi = Spi::init(&fake, SpiConfig::DEFAULT);

    // DFF flipped behind the driver's back: the live register wins.
    fake.set_cr1(fake.cr1() | CR1_DFF);
    assert_eq!(spi.submit_transmit(&data), Ok(()));
    assert_eq!(spi.tx_step(), Some(FrameWidth::Bits16));

    spi.on_interrupt();
    assert_eq!(fake.frames().len(), 1);
    assert_eq!(fake.frames().first().map(|f| f.width), Some(AccessWidth::HalfWord));
    assert_eq!(fake.frame_values().as_slice(), &[0xABCD]);
}

#[test]
fn eight_bit_receive_uses_byte_loads() {
    let fake = FakeSpi::new();
    let mut buf = [0u8; 2];
    let mut spi = Spi::init(&fake, SpiConfig::DEFAULT);

    assert_eq!(spi.submit_receive(&mut buf), Ok(()));
    assert_eq!(spi.rx_step(), Some(FrameWidth::Bits8));
    assert!(fake.push_rx(0x01));
    assert!(fake.push_rx(0x02));
    spi.on_interrupt();
    spi.on_interrupt();

    assert_eq!(
        fake.read_widths().as_slice(),
        &[AccessWidth::Byte, AccessWidth::Byte]
    );
}

// ── Receive ──────────────────────────────────────────────────────────────────

#[test]
fn receive_fills_the_buffer_and_hands_it_back() {
    let fake = FakeSpi::new();
    let mut buf = [0u8; 4];
    let mut spi = Spi::init(&fake, wide());

    assert_eq!(spi.submit_receive(&mut buf), Ok(()));
    assert!(fake.push_rx(0x1234));
    spi.on_interrupt();
    assert_eq!(spi.rx_remaining(), 2);
    assert!(spi.take_received().is_none());

    assert!(fake.push_rx(0x5678));
    spi.on_interrupt();

    assert_eq!(spi.rx_state(), BusState::Free);
    assert_eq!(fake.cr2() & CR2_RXNEIE, 0);
    assert_eq!(
        spi.take_received().as_deref(),
        Some([0x34, 0x12, 0x78, 0x56].as_slice())
    );
    assert!(spi.take_received().is_none());
}

#[test]
fn full_duplex_services_both_directions_per_interrupt() {
    let fake = FakeSpi::with_loopback();
    let data = [0xC1, 0xC2, 0xC3];
    let mut buf = [0u8; 3];
    let mut spi = Spi::init(&fake, SpiConfig::DEFAULT);

    assert_eq!(spi.submit_transmit(&data), Ok(()));
    assert_eq!(spi.submit_receive(&mut buf), Ok(()));

    for _ in 0..3 {
        spi.on_interrupt();
    }

    assert_eq!(spi.tx_state(), BusState::Free);
    assert_eq!(spi.rx_state(), BusState::Free);
    assert_eq!(spi.take_received().as_deref(), Some(data.as_slice()));
}

// ── Completion handler ───────────────────────────────────────────────────────

static TX_DONE: AtomicUsize = AtomicUsize::new(0);
static RX_DONE: AtomicUsize = AtomicUsize::new(0);

fn count_completion(direction: Direction) {
    let counter = match direction {
        Direction::Transmit => &TX_DONE,
        Direction::Receive => &RX_DONE,
    };
    counter.fetch_add(1, Ordering::SeqCst);
}

#[test]
fn completion_handler_runs_once_per_direction() {
    let fake = FakeSpi::with_loopback();
    let data = [1, 2, 3, 4];
    let mut buf = [0u8; 4];
    let mut spi = Spi::init(&fake, SpiConfig::DEFAULT);
    spi.set_completion_handler(Some(count_completion));

    assert_eq!(spi.submit_transmit(&data), Ok(()));
    assert_eq!(spi.submit_receive(&mut buf), Ok(()));
    for _ in 0..8 {
        spi.on_interrupt();
    }

    assert_eq!(TX_DONE.load(Ordering::SeqCst), 1);
    assert_eq!(RX_DONE.load(Ordering::SeqCst), 1);
}
