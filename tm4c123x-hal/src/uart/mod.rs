//! Universal Asynchronous Receiver Transmitter (UART)
//!
//! See [Chapter 14](https://www.ti.com/lit/ds/symlink/tm4c123gh6pm.pdf) of the datasheet for more details
//!
//! ## Usage
//!
//! ```no_run
//! use tm4c123x_hal::{pac, uart::{self, PinsA0A1, UartConfig, UartPeripheral}};
//!
//! let mut peripherals = pac::Peripherals::take().unwrap();
//! // Safety: this runs on a TM4C123x.
//! let bus = unsafe { pac::Direct::new() };
//!
//! // UART0 on PA0 (RX) and PA1 (TX), clocked from the internal oscillator.
//! let uart = UartPeripheral::new(peripherals.UART0, PinsA0A1, bus, &mut peripherals.SYSCTL)
//!     .enable(&uart::common_configs::_9600_8_N_1, uart::REFERENCE_CLOCK)
//!     .unwrap();
//!
//! uart.write_full_blocking(b"Hello World!\r\n");
//!
//! // Frames end with '#' on the wire and with NUL in memory.
//! let mut frame = [0u8; 32];
//! let len = uart.read_frame(&mut frame).unwrap();
//! uart.write_frame(&frame[..len]).unwrap();
//! ```

mod peripheral;
mod pins;
mod reader;
mod utils;
mod writer;

pub use peripheral::UartPeripheral;
pub use pins::*;
pub use reader::{ReadError, ReadErrorType, Reader};
pub use utils::{
    BaudRate, DataBits, Disabled, Enabled, Error, FrameError, Parity, SpeedMode, State, StopBits,
    UartConfig, UartDevice, FRAME_SENTINEL, REFERENCE_CLOCK,
};
pub use writer::Writer;

/// Common configurations for UART.
pub mod common_configs;
