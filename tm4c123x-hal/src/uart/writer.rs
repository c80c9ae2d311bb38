//! Universal Asynchronous Receiver Transmitter - Transmitter Code
//!
//! This module is for transmitting data with a UART.

use super::utils::RegisterBlock;
use super::{FrameError, UartDevice, ValidUartPinout, FRAME_SENTINEL};
use crate::pac::{Bus, Direct};
use core::ffi::CStr;
use core::fmt;
use core::{convert::Infallible, marker::PhantomData};
use embedded_hal_0_2::serial as eh0;
use embedded_hal_nb::serial::{ErrorType, Write};
use nb::Error::*;

/// Returns `Err(WouldBlock)` if the UART TX FIFO still has data in it or
/// `Ok(())` if the FIFO is empty.
pub(crate) fn transmit_flushed<B: Bus>(rb: &RegisterBlock<'_, B>) -> nb::Result<(), Infallible> {
    if rb.fr().txfe() {
        Ok(())
    } else {
        Err(WouldBlock)
    }
}

/// Returns `true` if the TX FIFO has space, or false if it is full
pub(crate) fn uart_is_writable<B: Bus>(rb: &RegisterBlock<'_, B>) -> bool {
    !rb.fr().txff()
}

/// Returns `true` if the UART is still shifting data out
pub(crate) fn uart_is_busy<B: Bus>(rb: &RegisterBlock<'_, B>) -> bool {
    rb.fr().busy()
}

/// Writes bytes to the UART.
///
/// This function writes as long as it can. As soon that the FIFO is full,
/// if:
/// - 0 bytes were written, a WouldBlock Error is returned
/// - some bytes were written, it is deemed to be a success
///
/// Upon success, the remaining (unwritten) slice is returned.
pub(crate) fn write_raw<'d, B: Bus>(
    rb: &RegisterBlock<'_, B>,
    data: &'d [u8],
) -> nb::Result<&'d [u8], Infallible> {
    let mut bytes_written = 0;

    for c in data {
        if !uart_is_writable(rb) {
            if bytes_written == 0 {
                return Err(WouldBlock);
            } else {
                return Ok(&data[bytes_written..]);
            }
        }

        rb.write_dr(*c);

        bytes_written += 1;
    }
    Ok(&data[bytes_written..])
}

/// Writes one byte to the UART, waiting for room in the TX FIFO first.
pub(crate) fn write_byte_blocking<B: Bus>(rb: &RegisterBlock<'_, B>, byte: u8) {
    while !uart_is_writable(rb) {
        core::hint::spin_loop();
    }
    rb.write_dr(byte);
}

/// Writes bytes to the UART.
///
/// This function blocks until the full buffer has been sent.
pub(crate) fn write_full_blocking<B: Bus>(rb: &RegisterBlock<'_, B>, data: &[u8]) {
    let mut temp = data;

    while !temp.is_empty() {
        temp = match write_raw(rb, temp) {
            Ok(remaining) => remaining,
            Err(WouldBlock) => continue,
            Err(Other(never)) => match never {},
        }
    }
}

/// Writes `data` up to, not including, its first NUL byte.
pub(crate) fn write_nul_terminated<B: Bus>(rb: &RegisterBlock<'_, B>, data: &[u8]) {
    let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
    write_full_blocking(rb, &data[..end]);
}

pub(crate) fn write_string<B: Bus>(rb: &RegisterBlock<'_, B>, s: &CStr) {
    write_full_blocking(rb, s.to_bytes());
}

/// Writes `payload` followed by the frame sentinel.
pub(crate) fn write_frame<B: Bus>(
    rb: &RegisterBlock<'_, B>,
    payload: &[u8],
) -> Result<(), FrameError> {
    if payload.contains(&FRAME_SENTINEL) {
        return Err(FrameError::SentinelInPayload);
    }
    write_full_blocking(rb, payload);
    write_byte_blocking(rb, FRAME_SENTINEL);
    Ok(())
}

/// Half of an [`UartPeripheral`] that is only capable of writing. Obtained by calling [`UartPeripheral::split()`]
///
/// [`UartPeripheral`]: struct.UartPeripheral.html
/// [`UartPeripheral::split()`]: struct.UartPeripheral.html#method.split
pub struct Writer<D: UartDevice, P: ValidUartPinout<D>, B: Bus = Direct> {
    pub(super) _device: D,
    pub(super) bus: B,
    pub(super) pins: PhantomData<P>,
}

impl<D: UartDevice, P: ValidUartPinout<D>, B: Bus> Writer<D, P, B> {
    fn rb(&self) -> RegisterBlock<'_, B> {
        RegisterBlock::of::<D>(&self.bus)
    }

    /// Is there space in the UART TX FIFO for new data to be written?
    pub fn uart_is_writable(&self) -> bool {
        uart_is_writable(&self.rb())
    }

    /// Is the UART still busy transmitting data?
    pub fn uart_is_busy(&self) -> bool {
        uart_is_busy(&self.rb())
    }

    /// Writes bytes to the UART.
    ///
    /// This function writes as long as it can. As soon that the FIFO is full,
    /// if:
    /// - 0 bytes were written, a WouldBlock Error is returned
    /// - some bytes were written, it is deemed to be a success
    ///
    /// Upon success, the remaining (unwritten) slice is returned.
    pub fn write_raw<'d>(&self, data: &'d [u8]) -> nb::Result<&'d [u8], Infallible> {
        write_raw(&self.rb(), data)
    }

    /// Writes one byte to the UART.
    ///
    /// This function blocks until there is room for it in the TX FIFO.
    pub fn write_byte_blocking(&self, byte: u8) {
        write_byte_blocking(&self.rb(), byte);
    }

    /// Writes bytes to the UART.
    ///
    /// This function blocks until the full buffer has been sent.
    pub fn write_full_blocking(&self, data: &[u8]) {
        write_full_blocking(&self.rb(), data);
    }

    /// Writes a C string, without its terminator.
    pub fn write_string(&self, s: &CStr) {
        write_string(&self.rb(), s);
    }

    /// Writes `data` up to, not including, its first NUL byte.
    pub fn write_nul_terminated(&self, data: &[u8]) {
        write_nul_terminated(&self.rb(), data);
    }

    /// Writes `payload` as a string frame, ended by [`FRAME_SENTINEL`].
    pub fn write_frame(&self, payload: &[u8]) -> Result<(), FrameError> {
        write_frame(&self.rb(), payload)
    }
}

impl<D: UartDevice, P: ValidUartPinout<D>, B: Bus> eh0::Write<u8> for Writer<D, P, B> {
    type Error = Infallible;

    fn write(&mut self, word: u8) -> nb::Result<(), Self::Error> {
        if self.write_raw(&[word]).is_err() {
            Err(WouldBlock)
        } else {
            Ok(())
        }
    }

    fn flush(&mut self) -> nb::Result<(), Self::Error> {
        transmit_flushed(&self.rb())
    }
}

impl<D: UartDevice, P: ValidUartPinout<D>, B: Bus> ErrorType for Writer<D, P, B> {
    type Error = core::convert::Infallible;
}

impl<D: UartDevice, P: ValidUartPinout<D>, B: Bus> Write<u8> for Writer<D, P, B> {
    fn write(&mut self, word: u8) -> nb::Result<(), Self::Error> {
        if self.write_raw(&[word]).is_err() {
            Err(WouldBlock)
        } else {
            Ok(())
        }
    }

    fn flush(&mut self) -> nb::Result<(), Self::Error> {
        transmit_flushed(&self.rb())
    }
}

impl<D: UartDevice, P: ValidUartPinout<D>, B: Bus> embedded_io::ErrorType for Writer<D, P, B> {
    type Error = Infallible;
}

impl<D: UartDevice, P: ValidUartPinout<D>, B: Bus> embedded_io::Write for Writer<D, P, B> {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        // Blocks if and only if no bytes can be written.
        let remaining = nb::block!(write_raw(&self.rb(), buf))?;
        Ok(buf.len() - remaining.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        nb::block!(transmit_flushed(&self.rb()))
    }
}

impl<D: UartDevice, P: ValidUartPinout<D>, B: Bus> embedded_io::WriteReady for Writer<D, P, B> {
    fn write_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(self.uart_is_writable())
    }
}

impl<D: UartDevice, P: ValidUartPinout<D>, B: Bus> fmt::Write for Writer<D, P, B> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.write_full_blocking(s.as_bytes());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pac::{uart, Block, UART0};
    use crate::sim::{SimBus, FIFO_DEPTH};

    fn enabled_bus() -> SimBus {
        let bus = SimBus::new();
        let mut lcrh = uart::Lcrh::default();
        lcrh.set_fen(true);
        let mut ctl = uart::Ctl::default();
        ctl.set_uarten(true);
        ctl.set_txe(true);
        bus.write(UART0::base() + uart::LCRH, lcrh.bits());
        bus.write(UART0::base() + uart::CTL, ctl.bits());
        bus
    }

    #[test]
    fn write_raw_stops_at_a_full_fifo() {
        let bus = SimBus::new();
        let mut lcrh = uart::Lcrh::default();
        lcrh.set_fen(true);
        bus.write(UART0::base() + uart::LCRH, lcrh.bits());
        // Transmitter disabled: nothing drains the FIFO.
        let rb = RegisterBlock::of::<UART0>(&bus);
        let data = [0x55; FIFO_DEPTH + 3];

        let remaining = write_raw(&rb, &data).ok().map(<[u8]>::len);
        assert_eq!(remaining, Some(3));
        assert!(matches!(write_raw(&rb, &data), Err(WouldBlock)));
        assert!(!uart_is_writable(&rb));
        assert!(uart_is_busy(&rb));
    }

    #[test]
    fn full_buffer_is_sent_in_order() {
        let bus = enabled_bus();
        let rb = RegisterBlock::of::<UART0>(&bus);
        let data: [u8; 40] = core::array::from_fn(|i| i as u8);

        write_full_blocking(&rb, &data);
        bus.settle();

        assert_eq!(bus.transmitted(0).as_slice(), &data);
        assert!(transmit_flushed(&rb).is_ok());
    }

    #[test]
    fn nul_terminated_data_stops_at_the_terminator() {
        let bus = enabled_bus();
        let rb = RegisterBlock::of::<UART0>(&bus);

        write_nul_terminated(&rb, b"AT\0garbage");
        write_nul_terminated(&rb, b"+OK");
        write_string(&rb, c"!");
        bus.settle();

        assert_eq!(bus.transmitted(0).as_slice(), b"AT+OK!");
    }

    #[test]
    fn frames_end_with_the_sentinel() {
        let bus = enabled_bus();
        let rb = RegisterBlock::of::<UART0>(&bus);

        assert_eq!(write_frame(&rb, b"key=42"), Ok(()));
        assert_eq!(write_frame(&rb, b""), Ok(()));
        bus.settle();

        assert_eq!(bus.transmitted(0).as_slice(), b"key=42##");
    }

    #[test]
    fn sentinel_in_payload_is_refused_before_sending() {
        let bus = enabled_bus();
        let rb = RegisterBlock::of::<UART0>(&bus);

        assert_eq!(
            write_frame(&rb, b"a#b"),
            Err(FrameError::SentinelInPayload)
        );
        bus.settle();

        assert!(bus.transmitted(0).is_empty());
    }
}
