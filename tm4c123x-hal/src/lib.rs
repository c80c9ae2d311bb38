//! HAL for the UARTs of the TM4C123x microcontrollers
//!
//! This is an implementation of the [`embedded-hal`] serial traits for the
//! two PL011-compatible UARTs of the TM4C123GH6PM (UART0 and UART1), covering
//! their clock gating, baud-rate generator, line control and pin routing.
//!
//! Register accesses go through a [`pac::Bus`]. On the microcontroller use
//! [`pac::Direct`]. On a host, the `sim` feature exports a simulated bus so the
//! driver can be exercised without hardware.
//!
//! NOTE This HAL is still under active development. This API will remain volatile until 1.0.0
//!
//! [`embedded-hal`]: https://crates.io/crates/embedded-hal

#![warn(missing_docs)]
#![no_std]

#[cfg(all(feature = "critical-section-impl", target_arch = "arm"))]
mod critical_section_impl;

pub mod gpio;
pub mod pac;
#[cfg(any(test, feature = "sim"))]
pub mod sim;
mod sysctl;
mod typelevel;
pub mod uart;

pub use tm4c_hal_common::uart::{BaudDivisor, DivisorError};
