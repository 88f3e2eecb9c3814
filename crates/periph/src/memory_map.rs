//! STM32F407 peripheral base addresses.
//!
//! Reference: RM0090 Rev 19, §2.3 "Memory map", Table 1.

// ── APB2 ─────────────────────────────────────────────────────────────────────

/// SPI1 register block (APB2).
pub const SPI1_BASE: usize = 0x4001_3000;

/// SYSCFG register block (APB2). Holds the EXTI line → port routing.
pub const SYSCFG_BASE: usize = 0x4001_3800;

/// EXTI register block (APB2).
pub const EXTI_BASE: usize = 0x4001_3C00;

// ── APB1 ─────────────────────────────────────────────────────────────────────

/// SPI2 register block (APB1).
pub const SPI2_BASE: usize = 0x4000_3800;

/// SPI3 register block (APB1).
pub const SPI3_BASE: usize = 0x4000_3C00;

// ── AHB1 ─────────────────────────────────────────────────────────────────────

/// GPIOA register block. Ports B..I follow at [`GPIO_PORT_STRIDE`] intervals.
pub const GPIOA_BASE: usize = 0x4002_0000;

/// Distance between consecutive GPIO port blocks.
pub const GPIO_PORT_STRIDE: usize = 0x400;

/// GPIOB register block.
pub const GPIOB_BASE: usize = 0x4002_0400;
/// GPIOC register block.
pub const GPIOC_BASE: usize = 0x4002_0800;
/// GPIOD register block.
pub const GPIOD_BASE: usize = 0x4002_0C00;
/// GPIOE register block.
pub const GPIOE_BASE: usize = 0x4002_1000;
/// GPIOF register block.
pub const GPIOF_BASE: usize = 0x4002_1400;
/// GPIOG register block.
pub const GPIOG_BASE: usize = 0x4002_1800;
/// GPIOH register block.
pub const GPIOH_BASE: usize = 0x4002_1C00;
/// GPIOI register block.
pub const GPIOI_BASE: usize = 0x4002_2000;

// ── Cortex-M4 private peripheral bus ─────────────────────────────────────────

/// NVIC register block, starting at ISER0.
pub const NVIC_BASE: usize = 0xE000_E100;
