//! Universal Asynchronous Receiver Transmitter - Receiver Code
//!
//! This module is for receiving data with a UART.

use super::utils::RegisterBlock;
use super::{FrameError, UartDevice, ValidUartPinout, FRAME_SENTINEL};
use crate::pac::{Bus, Direct};
use fugit::HertzU32;

use embedded_hal_0_2::serial as eh0;
use embedded_hal_nb::serial::{ErrorType, Read};
use nb::Error::*;

/// When there's a read error.
pub struct ReadError<'err> {
    /// The type of error
    pub err_type: ReadErrorType,

    /// Reference to the data that was read but eventually discarded because of the error.
    pub discarded: &'err [u8],
}

/// Possible types of read errors. See Section 14.6, Register 1: "UART Data (UARTDR)"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReadErrorType {
    /// Triggered when the FIFO (or shift-register) is overflowed.
    Overrun,

    /// Triggered when a break is received
    Break,

    /// Triggered when there is a parity mismatch between what's received and our settings.
    Parity,

    /// Triggered when the received character didn't have a valid stop bit.
    Framing,
}

impl embedded_hal_nb::serial::Error for ReadErrorType {
    fn kind(&self) -> embedded_hal_nb::serial::ErrorKind {
        match self {
            ReadErrorType::Overrun => embedded_hal_nb::serial::ErrorKind::Overrun,
            ReadErrorType::Break => embedded_hal_nb::serial::ErrorKind::Other,
            ReadErrorType::Parity => embedded_hal_nb::serial::ErrorKind::Parity,
            ReadErrorType::Framing => embedded_hal_nb::serial::ErrorKind::FrameFormat,
        }
    }
}

impl embedded_io::Error for ReadErrorType {
    fn kind(&self) -> embedded_io::ErrorKind {
        embedded_io::ErrorKind::Other
    }
}

pub(crate) fn is_readable<B: Bus>(rb: &RegisterBlock<'_, B>) -> bool {
    !rb.fr().rxfe()
}

/// Pops one byte from the receive FIFO, if there is one.
pub(crate) fn read_one<B: Bus>(rb: &RegisterBlock<'_, B>) -> nb::Result<u8, ReadErrorType> {
    if !is_readable(rb) {
        return Err(WouldBlock);
    }

    let read = rb.read_dr();
    let mut error: Option<ReadErrorType> = None;

    if read.oe() {
        error = Some(ReadErrorType::Overrun);
    }

    if read.be() {
        error = Some(ReadErrorType::Break);
    }

    if read.pe() {
        error = Some(ReadErrorType::Parity);
    }

    if read.fe() {
        error = Some(ReadErrorType::Framing);
    }

    match error {
        Some(err_type) => Err(Other(err_type)),
        None => Ok(read.data()),
    }
}

pub(crate) fn read_raw<'b, B: Bus>(
    rb: &RegisterBlock<'_, B>,
    buffer: &'b mut [u8],
) -> nb::Result<usize, ReadError<'b>> {
    let mut bytes_read = 0;

    while bytes_read < buffer.len() {
        match read_one(rb) {
            Ok(byte) => {
                buffer[bytes_read] = byte;
                bytes_read += 1;
            }
            Err(WouldBlock) if bytes_read == 0 => return Err(WouldBlock),
            Err(WouldBlock) => break,
            Err(Other(err_type)) => {
                return Err(Other(ReadError {
                    err_type,
                    discarded: &buffer[..bytes_read],
                }));
            }
        }
    }

    Ok(bytes_read)
}

pub(crate) fn read_byte_blocking<B: Bus>(rb: &RegisterBlock<'_, B>) -> Result<u8, ReadErrorType> {
    nb::block!(read_one(rb))
}

pub(crate) fn read_full_blocking<B: Bus>(
    rb: &RegisterBlock<'_, B>,
    buffer: &mut [u8],
) -> Result<(), ReadErrorType> {
    let mut offset = 0;

    while offset != buffer.len() {
        offset += match read_raw(rb, &mut buffer[offset..]) {
            Ok(bytes_read) => bytes_read,
            Err(e) => match e {
                Other(inner) => return Err(inner.err_type),
                WouldBlock => continue,
            },
        }
    }

    Ok(())
}

pub(crate) fn read_frame<B: Bus>(
    rb: &RegisterBlock<'_, B>,
    buffer: &mut [u8],
) -> Result<usize, FrameError> {
    // One slot is always kept for the NUL terminator.
    let capacity = buffer.len().saturating_sub(1);
    let mut stored = 0;
    let mut discarded = 0;
    let mut line_error = None;

    // The whole frame is consumed, sentinel included, whatever happens to it.
    loop {
        let byte = match read_byte_blocking(rb) {
            Ok(byte) => byte,
            Err(error) => {
                line_error.get_or_insert(error);
                continue;
            }
        };
        if byte == FRAME_SENTINEL {
            break;
        }
        if stored < capacity && line_error.is_none() {
            buffer[stored] = byte;
            stored += 1;
        } else {
            discarded += 1;
        }
    }

    if let Some(terminator) = buffer.get_mut(stored) {
        *terminator = 0;
    }

    if let Some(error) = line_error {
        Err(FrameError::Read(error))
    } else if discarded > 0 || buffer.is_empty() {
        Err(FrameError::Overflow { stored, discarded })
    } else {
        Ok(stored)
    }
}

/// # Safety
///
/// `buffer` must be valid for writes of the whole incoming frame plus its NUL
/// terminator.
pub(crate) unsafe fn read_frame_unbounded<B: Bus>(
    rb: &RegisterBlock<'_, B>,
    buffer: *mut u8,
) -> Result<usize, ReadErrorType> {
    let mut stored = 0;
    let mut line_error = None;

    loop {
        let byte = match read_byte_blocking(rb) {
            Ok(byte) => byte,
            Err(error) => {
                line_error.get_or_insert(error);
                continue;
            }
        };
        if byte == FRAME_SENTINEL {
            break;
        }
        if line_error.is_none() {
            buffer.add(stored).write(byte);
            stored += 1;
        }
    }

    buffer.add(stored).write(0);
    match line_error {
        Some(error) => Err(error),
        None => Ok(stored),
    }
}

/// Half of an [`UartPeripheral`] that is only capable of reading. Obtained by calling [`UartPeripheral::split()`]
///
/// [`UartPeripheral`]: struct.UartPeripheral.html
/// [`UartPeripheral::split()`]: struct.UartPeripheral.html#method.split
pub struct Reader<D: UartDevice, P: ValidUartPinout<D>, B: Bus = Direct> {
    pub(super) device: D,
    pub(super) pins: P,
    pub(super) bus: B,
    pub(super) effective_baudrate: HertzU32,
    pub(super) read_error: Option<ReadErrorType>,
}

impl<D: UartDevice, P: ValidUartPinout<D>, B: Bus> Reader<D, P, B> {
    fn rb(&self) -> RegisterBlock<'_, B> {
        RegisterBlock::of::<D>(&self.bus)
    }

    /// Is there data in the UART RX FIFO ready to be read?
    pub fn uart_is_readable(&self) -> bool {
        is_readable(&self.rb())
    }

    /// Reads bytes from the UART.
    /// This function reads as long as it can. As soon that the FIFO is empty, if :
    /// - 0 bytes were read, a WouldBlock Error is returned
    /// - some bytes were read, it is deemed to be a success
    ///
    /// Upon success, it will return how many bytes were read.
    pub fn read_raw<'b>(&self, buffer: &'b mut [u8]) -> nb::Result<usize, ReadError<'b>> {
        read_raw(&self.rb(), buffer)
    }

    /// Reads one byte from the UART.
    ///
    /// This function blocks until a byte has been received.
    pub fn read_byte_blocking(&self) -> Result<u8, ReadErrorType> {
        read_byte_blocking(&self.rb())
    }

    /// Reads bytes from the UART.
    ///
    /// This function blocks until the full buffer has been received.
    pub fn read_full_blocking(&self, buffer: &mut [u8]) -> Result<(), ReadErrorType> {
        read_full_blocking(&self.rb(), buffer)
    }

    /// Receives a string frame.
    ///
    /// See [`UartPeripheral::read_frame`](super::UartPeripheral::read_frame).
    pub fn read_frame(&self, buffer: &mut [u8]) -> Result<usize, FrameError> {
        read_frame(&self.rb(), buffer)
    }

    /// Receives a string frame without bounds checking.
    ///
    /// # Safety
    ///
    /// See [`UartPeripheral::read_frame_unbounded`](super::UartPeripheral::read_frame_unbounded).
    pub unsafe fn read_frame_unbounded(&self, buffer: *mut u8) -> Result<usize, ReadErrorType> {
        read_frame_unbounded(&self.rb(), buffer)
    }
}

impl<D: UartDevice, P: ValidUartPinout<D>, B: Bus> embedded_io::ErrorType for Reader<D, P, B> {
    type Error = ReadErrorType;
}

impl<D: UartDevice, P: ValidUartPinout<D>, B: Bus> embedded_io::Read for Reader<D, P, B> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        // If the last read stored an error, report it now
        if let Some(err) = self.read_error.take() {
            return Err(err);
        }
        match nb::block!(self.read_raw(buf)) {
            Ok(bytes_read) => Ok(bytes_read),
            Err(err) if !err.discarded.is_empty() => {
                // If an error was reported but some bytes were already read,
                // return the data now and store the error for the next
                // invocation.
                self.read_error = Some(err.err_type);
                Ok(err.discarded.len())
            }
            Err(err) => Err(err.err_type),
        }
    }
}

impl<D: UartDevice, P: ValidUartPinout<D>, B: Bus> embedded_io::ReadReady for Reader<D, P, B> {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(self.uart_is_readable() || self.read_error.is_some())
    }
}

impl<D: UartDevice, P: ValidUartPinout<D>, B: Bus> eh0::Read<u8> for Reader<D, P, B> {
    type Error = ReadErrorType;

    fn read(&mut self) -> nb::Result<u8, Self::Error> {
        read_one(&self.rb())
    }
}

impl<D: UartDevice, P: ValidUartPinout<D>, B: Bus> ErrorType for Reader<D, P, B> {
    type Error = ReadErrorType;
}

impl<D: UartDevice, P: ValidUartPinout<D>, B: Bus> Read<u8> for Reader<D, P, B> {
    fn read(&mut self) -> nb::Result<u8, Self::Error> {
        read_one(&self.rb())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pac::{uart, Block, UART0};
    use crate::sim::{LineError, SimBus};

    fn enabled_bus() -> SimBus {
        let bus = SimBus::new();
        let mut lcrh = uart::Lcrh::default();
        lcrh.set_fen(true);
        let mut ctl = uart::Ctl::default();
        ctl.set_uarten(true);
        ctl.set_rxe(true);
        bus.write(UART0::base() + uart::LCRH, lcrh.bits());
        bus.write(UART0::base() + uart::CTL, ctl.bits());
        bus
    }

    #[test]
    fn read_raw_would_block_on_empty_fifo() {
        let bus = enabled_bus();
        let rb = RegisterBlock::of::<UART0>(&bus);
        let mut buffer = [0; 4];
        assert!(matches!(read_raw(&rb, &mut buffer), Err(WouldBlock)));
    }

    #[test]
    fn read_raw_stops_when_the_fifo_runs_dry() {
        let bus = enabled_bus();
        bus.inject(0, b"ab");
        let rb = RegisterBlock::of::<UART0>(&bus);
        let mut buffer = [0; 4];
        // Each flag read lets one byte arrive: the first poll sees "a", the
        // second "b", the third finds the FIFO empty.
        assert_eq!(read_raw(&rb, &mut buffer).ok(), Some(2));
        assert_eq!(&buffer[..2], b"ab");
    }

    #[test]
    fn line_errors_are_reported_with_the_bytes_read_so_far() {
        let bus = enabled_bus();
        bus.inject(0, b"ok");
        bus.inject_with_error(0, b'!', LineError::Framing);
        let rb = RegisterBlock::of::<UART0>(&bus);
        let mut buffer = [0; 4];
        match read_raw(&rb, &mut buffer) {
            Err(Other(ReadError {
                err_type,
                discarded,
            })) => {
                assert_eq!(err_type, ReadErrorType::Framing);
                assert_eq!(discarded, b"ok");
            }
            _ => panic!("expected a framing error"),
        }
    }

    #[test]
    fn frame_is_stored_with_a_nul_terminator() {
        let bus = enabled_bus();
        bus.inject(0, b"hello#");
        let rb = RegisterBlock::of::<UART0>(&bus);
        let mut buffer = [0xAA; 8];
        assert_eq!(read_frame(&rb, &mut buffer), Ok(5));
        assert_eq!(&buffer[..6], b"hello\0");
        assert_eq!(buffer[6], 0xAA);
    }

    #[test]
    fn exact_fit_frame_uses_the_last_slot_for_the_terminator() {
        let bus = enabled_bus();
        bus.inject(0, b"abc#");
        let rb = RegisterBlock::of::<UART0>(&bus);
        let mut buffer = [0xAA; 4];
        assert_eq!(read_frame(&rb, &mut buffer), Ok(3));
        assert_eq!(&buffer, b"abc\0");
    }

    #[test]
    fn oversized_frame_is_truncated_and_the_next_one_is_intact() {
        let bus = enabled_bus();
        bus.inject(0, b"abcdef#xy#");
        let rb = RegisterBlock::of::<UART0>(&bus);
        let mut buffer = [0xAA; 4];

        assert_eq!(
            read_frame(&rb, &mut buffer),
            Err(FrameError::Overflow {
                stored: 3,
                discarded: 3
            })
        );
        assert_eq!(&buffer, b"abc\0");

        assert_eq!(read_frame(&rb, &mut buffer), Ok(2));
        assert_eq!(&buffer[..3], b"xy\0");
    }

    #[test]
    fn empty_buffer_cannot_hold_even_an_empty_frame() {
        let bus = enabled_bus();
        bus.inject(0, b"#");
        let rb = RegisterBlock::of::<UART0>(&bus);
        assert_eq!(
            read_frame(&rb, &mut []),
            Err(FrameError::Overflow {
                stored: 0,
                discarded: 0
            })
        );
    }

    #[test]
    fn line_error_drops_the_rest_of_the_frame() {
        let bus = enabled_bus();
        bus.inject(0, b"ab");
        bus.inject_with_error(0, b'c', LineError::Parity);
        bus.inject(0, b"de#next#");
        let rb = RegisterBlock::of::<UART0>(&bus);

        let mut buffer = [0xAA; 8];
        assert_eq!(
            read_frame(&rb, &mut buffer),
            Err(FrameError::Read(ReadErrorType::Parity))
        );
        assert_eq!(&buffer[..3], b"ab\0");

        let mut next = [0xAA; 8];
        assert_eq!(read_frame(&rb, &mut next), Ok(4));
        assert_eq!(&next[..5], b"next\0");
    }

    #[test]
    fn unbounded_frame_resynchronises_after_a_line_error() {
        let bus = enabled_bus();
        bus.inject_with_error(0, b'x', LineError::Framing);
        bus.inject(0, b"yz#ok#");
        let rb = RegisterBlock::of::<UART0>(&bus);

        let mut buffer = [0xAA; 8];
        let result = unsafe { read_frame_unbounded(&rb, buffer.as_mut_ptr()) };
        assert_eq!(result, Err(ReadErrorType::Framing));
        assert_eq!(buffer[0], 0);

        let result = unsafe { read_frame_unbounded(&rb, buffer.as_mut_ptr()) };
        assert_eq!(result, Ok(2));
        assert_eq!(&buffer[..3], b"ok\0");
    }

    #[test]
    fn unbounded_frame_writes_through_the_pointer() {
        let bus = enabled_bus();
        bus.inject(0, b"legacy#");
        let rb = RegisterBlock::of::<UART0>(&bus);
        let mut buffer = [0xAA; 16];
        let stored = unsafe { read_frame_unbounded(&rb, buffer.as_mut_ptr()) };
        assert_eq!(stored, Ok(6));
        assert_eq!(&buffer[..7], b"legacy\0");
    }
}
