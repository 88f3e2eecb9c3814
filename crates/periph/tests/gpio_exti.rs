//! Board bring-up sequences across GPIO, SYSCFG, EXTI and NVIC.

use embedded_hal::digital::{InputPin, OutputPin, StatefulOutputPin};
use periph::exti::{FTSR, IMR, PR, RTSR, SYSCFG_EXTICR1};
use periph::gpio::{AFRL, BSRR, IDR, MODER, ODR, OSPEEDR, PUPDR};
use periph::mocks::FakeRegisters;
use periph::nvic::ISER;
use periph::{
    AlternateFunction, Exti, ExtiConfig, ExtiMode, GpioError, GpioPort, Irq, Nvic, PinConfig,
    PinState, Pins, Port, Pull, Syscfg, Trigger,
};

type FakePort = FakeRegisters<10>;

/// Falling-edge button on PC13 → EXTI13 → EXTI15_10.
#[test]
fn button_interrupt_wiring() {
    let gpioc = FakePort::new();
    let syscfg_regs = FakeRegisters::<6>::new();
    let exti_regs = FakeRegisters::<6>::new();
    let nvic_regs = FakeRegisters::<0x68>::new();

    GpioPort::new(&gpioc).init(&PinConfig::input(Pins::PIN_13).with_pull(Pull::Up));
    assert_eq!(Syscfg::new(&syscfg_regs).route(Port::C, 13), Ok(()));

    let exti = Exti::new(&exti_regs);
    let line = ExtiConfig {
        line: 13,
        enabled: true,
        mode: ExtiMode::Interrupt,
        trigger: Trigger::Falling,
    };
    assert_eq!(exti.init(&line), Ok(()));

    let irq = Irq::for_exti_line(13);
    assert_eq!(irq, Some(Irq::Exti15_10));
    if let Some(irq) = irq {
        Nvic::new(&nvic_regs).enable(irq);
    }

    assert_eq!(gpioc.get(MODER), 0);
    assert_eq!(gpioc.get(PUPDR), 0b01 << 26);
    // EXTICR4 holds lines 12..=15; line 13 is the second field.
    assert_eq!(syscfg_regs.get(SYSCFG_EXTICR1 + 12), 2 << 4);
    assert_eq!(exti_regs.get(IMR), 1 << 13);
    assert_eq!(exti_regs.get(FTSR), 1 << 13);
    assert_eq!(exti_regs.get(RTSR), 0);
    assert_eq!(nvic_regs.writes_to(ISER + 4).as_slice(), &[1 << 8]);
}

#[test]
fn pending_line_is_acknowledged_alone() {
    let exti_regs = FakeRegisters::<6>::new();
    exti_regs.set(PR, (1 << 0) | (1 << 13));
    let exti = Exti::new(&exti_regs);

    assert_eq!(exti.is_pending(13), Ok(true));
    assert_eq!(exti.clear_pending(13), Ok(()));
    assert_eq!(exti_regs.writes_to(PR).as_slice(), &[1 << 13]);
}

/// SPI1 on PA5/PA6/PA7, AF5.
#[test]
fn spi_pins_in_alternate_mode() {
    let gpioa = FakePort::new();
    let pins = Pins::PIN_5 | Pins::PIN_6 | Pins::PIN_7;
    GpioPort::new(&gpioa).init(&PinConfig::alternate(pins, AlternateFunction::AF5));

    assert_eq!(gpioa.get(MODER), 0b10_10_10 << 10);
    assert_eq!(gpioa.get(OSPEEDR), 0b11_11_11 << 10);
    assert_eq!(gpioa.get(AFRL), 0x555 << 20);
}

#[allow(clippy::unwrap_used)]
#[test]
fn pin_handle_drives_embedded_hal_traits() {
    let gpiod = FakePort::new();
    let port = GpioPort::new(&gpiod);
    port.init(&PinConfig::output(Pins::PIN_12));

    let mut led = port.pin(12).unwrap();
    assert_eq!(led.set_high(), Ok(()));
    assert_eq!(led.set_low(), Ok(()));
    assert_eq!(gpiod.writes_to(BSRR).as_slice(), &[1 << 12, 1 << 28]);

    gpiod.set(ODR, 1 << 12);
    assert_eq!(led.is_set_high(), Ok(true));
    assert_eq!(led.toggle(), Ok(()));
    assert_eq!(gpiod.writes_to(BSRR).last(), Some(&(1 << 28)));

    gpiod.set(IDR, 0);
    assert_eq!(led.is_low(), Ok(true));
    assert_eq!(port.read(Pins::PIN_12), PinState::Low);
}

#[test]
fn pin_sixteen_does_not_exist() {
    let regs = FakePort::new();
    let port = GpioPort::new(&regs);
    assert!(matches!(port.pin(16), Err(GpioError::InvalidPin { pin: 16 })));
}
