//! Common HAL code
//!
//! This library contains types and functions which are shared between the
//! TM4C123x HAL and any other HAL built around the same PL011-derived UART.
//!
//! You shouldn't include anything here which requires either the `cortex-m`
//! crate, or a register access layer.

#![no_std]

pub mod uart;
