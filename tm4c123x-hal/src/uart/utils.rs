use fugit::HertzU32;

use crate::pac::{self, uart::*, Block, Bus, UART0, UART1};
use crate::sysctl::ClockGate;
use crate::typelevel::Sealed;

#[doc(inline)]
pub use tm4c_hal_common::uart::{BaudRate, DataBits, Parity, SpeedMode, StopBits, UartConfig};

/// Frequency of the precision internal oscillator (PIOSC), the UART clock
/// source out of reset.
pub const REFERENCE_CLOCK: HertzU32 = HertzU32::from_raw(16_000_000);

/// Byte that ends a string frame on the wire.
pub const FRAME_SENTINEL: u8 = b'#';

/// Error type for UART operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Bad argument : the baud rate cannot be derived from the clock, ...
    BadArgument,
    /// No configuration was supplied.
    MissingConfig,
}

/// Error type for string frame transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// The received payload did not fit in the buffer.
    ///
    /// `stored` bytes were kept (followed by a NUL terminator when the buffer
    /// is not empty), the other `discarded` bytes were dropped up to and
    /// including the sentinel, so the next frame starts clean.
    Overflow {
        /// Bytes kept in the buffer.
        stored: usize,
        /// Payload bytes read from the wire and dropped.
        discarded: usize,
    },
    /// The payload to send contains [`FRAME_SENTINEL`] and would end the frame early.
    SentinelInPayload,
    /// A line error was reported while receiving the frame.
    ///
    /// The bytes received before the error are NUL terminated in the buffer and
    /// the rest of the frame was dropped up to and including the sentinel.
    Read(super::ReadErrorType),
}

/// State of the UART Peripheral.
pub trait State: Sealed {}

/// Trait to handle both underlying devices (UART0 & UART1)
pub trait UartDevice: Block + ClockGate + Sealed + 'static {
    /// Index of the Uart.
    const ID: usize;

    /// Unchecked creation of a second handle to the device.
    ///
    /// # Safety
    ///
    /// The two handles must never write the same register.
    unsafe fn steal() -> Self;
}

impl UartDevice for UART0 {
    const ID: usize = 0;

    unsafe fn steal() -> Self {
        pac::Peripherals::steal().UART0
    }
}
impl Sealed for UART0 {}
impl UartDevice for UART1 {
    const ID: usize = 1;

    unsafe fn steal() -> Self {
        pac::Peripherals::steal().UART1
    }
}
impl Sealed for UART1 {}

/// UART is enabled.
pub struct Enabled;

/// UART is disabled.
pub struct Disabled;

impl State for Enabled {}
impl Sealed for Enabled {}
impl State for Disabled {}
impl Sealed for Disabled {}

/// The registers of one UART, seen through a bus.
pub(crate) struct RegisterBlock<'b, B: Bus> {
    bus: &'b B,
    base: u32,
}

impl<'b, B: Bus> RegisterBlock<'b, B> {
    pub(crate) fn of<D: UartDevice>(bus: &'b B) -> Self {
        RegisterBlock { bus, base: D::base() }
    }

    pub(crate) fn fr(&self) -> Fr {
        Fr::from_bits(self.bus.read(self.base + FR))
    }

    pub(crate) fn read_dr(&self) -> Dr {
        Dr::from_bits(self.bus.read(self.base + DR))
    }

    pub(crate) fn write_dr(&self, byte: u8) {
        self.bus.write(self.base + DR, u32::from(byte));
    }

    pub(crate) fn write_divisor(&self, integer: u16, fractional: u8) {
        self.bus.write(self.base + IBRD, u32::from(integer));
        self.bus.write(self.base + FBRD, u32::from(fractional));
    }

    pub(crate) fn write_lcrh(&self, lcrh: Lcrh) {
        self.bus.write(self.base + LCRH, lcrh.bits());
    }

    pub(crate) fn modify_ctl(&self, f: impl FnOnce(&mut Ctl)) {
        self.bus.modify(self.base + CTL, |bits| {
            let mut ctl = Ctl::from_bits(bits);
            f(&mut ctl);
            ctl.bits()
        });
    }
}

