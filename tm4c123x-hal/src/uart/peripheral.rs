//! Universal Asynchronous Receiver Transmitter - Bi-directional Peripheral Code
//!
//! This module brings together `uart::reader` and `uart::writer` to give a
//! UartPeripheral object that can both read and write.

use core::ffi::CStr;
use core::{convert::Infallible, fmt, marker::PhantomData};
use embedded_hal_0_2::serial as eh0;
use fugit::HertzU32;
use nb::Error::WouldBlock;
use tm4c_hal_common::uart::BaudDivisor;

use crate::{
    gpio,
    pac::{self, uart::Lcrh, Bus, Direct},
    sysctl,
    uart::{utils::RegisterBlock, *},
};

use embedded_hal_nb::serial::{ErrorType, Read, Write};

/// An UART Peripheral based on an underlying UART device.
pub struct UartPeripheral<S: State, D: UartDevice, P: ValidUartPinout<D>, B: Bus = Direct> {
    device: D,
    _state: S,
    pins: P,
    bus: B,
    effective_baudrate: HertzU32,
    read_error: Option<ReadErrorType>,
}

impl<S: State, D: UartDevice, P: ValidUartPinout<D>, B: Bus> UartPeripheral<S, D, P, B> {
    fn transition<To: State>(self, state: To) -> UartPeripheral<To, D, P, B> {
        UartPeripheral {
            device: self.device,
            pins: self.pins,
            bus: self.bus,
            effective_baudrate: self.effective_baudrate,
            _state: state,
            read_error: None,
        }
    }

    fn rb(&self) -> RegisterBlock<'_, B> {
        RegisterBlock::of::<D>(&self.bus)
    }

    /// Releases the underlying device, pins and bus.
    pub fn free(self) -> (D, P, B) {
        (self.device, self.pins, self.bus)
    }
}

impl<D: UartDevice, P: ValidUartPinout<D>, B: Bus> UartPeripheral<Disabled, D, P, B> {
    /// Creates an UartPeripheral in Disabled state.
    ///
    /// Gates on the clocks of the UART and of the port its pins belong to, and
    /// waits until both are ready.
    pub fn new(
        device: D,
        pins: P,
        bus: B,
        sysctl: &mut pac::SYSCTL,
    ) -> UartPeripheral<Disabled, D, P, B> {
        sysctl::enable_clocks(&bus, sysctl, &[device.gate(), P::PORT.gate()]);

        UartPeripheral {
            device,
            _state: Disabled,
            pins,
            bus,
            effective_baudrate: HertzU32::from_raw(0),
            read_error: None,
        }
    }

    /// Enables the provided UART device with the given configuration.
    ///
    /// `frequency` is the UART clock, usually [`REFERENCE_CLOCK`]. The UART is
    /// disabled while its divisor and line control are written, then its pins
    /// are routed, then it is enabled with both directions on. Fails with
    /// [`Error::BadArgument`], before any register is touched, when the baud
    /// rate cannot be derived from `frequency`.
    pub fn enable(
        self,
        config: &UartConfig,
        frequency: HertzU32,
    ) -> Result<UartPeripheral<Enabled, D, P, B>, Error> {
        self.enable_with(Some(config), frequency)
            .map_err(|(error, _)| error)
    }

    /// Like [`enable`](Self::enable), for callers whose configuration may be
    /// absent.
    ///
    /// Without a configuration nothing is written and [`Error::MissingConfig`]
    /// is returned. On any error the disabled peripheral is handed back.
    pub fn enable_with(
        self,
        config: Option<&UartConfig>,
        frequency: HertzU32,
    ) -> Result<UartPeripheral<Enabled, D, P, B>, (Error, Self)> {
        let Some(config) = config else {
            return Err((Error::MissingConfig, self));
        };

        let divisor = match BaudDivisor::compute(frequency, config.baudrate, config.speed_mode) {
            Ok(divisor) => divisor,
            Err(_) => return Err((Error::BadArgument, self)),
        };

        let rb = self.rb();

        rb.modify_ctl(|ctl| ctl.set_uarten(false));
        rb.modify_ctl(|ctl| ctl.set_hse(config.speed_mode == SpeedMode::HighSpeed));

        configure_baudrate(&rb, divisor);

        let mut lcrh = Lcrh::default();
        // FIFOs are enabled
        lcrh.set_fen(true);
        set_format(&mut lcrh, &config.data_bits, &config.stop_bits, &config.parity);
        // Also latches the divisor written just before.
        rb.write_lcrh(lcrh);

        gpio::route_alternate_function(&self.bus, P::PORT, P::TX, P::FUNCTION);
        gpio::route_alternate_function(&self.bus, P::PORT, P::RX, P::FUNCTION);

        rb.modify_ctl(|ctl| {
            ctl.set_uarten(true);
            ctl.set_txe(true);
            ctl.set_rxe(true);
        });

        let effective_baudrate = divisor.effective_baudrate(frequency, config.speed_mode);

        #[cfg(feature = "defmt")]
        defmt::debug!(
            "UART{}: {} (ibrd={}, fbrd={}), effective {} Bd",
            D::ID,
            config,
            divisor.integer,
            divisor.fractional,
            effective_baudrate.to_Hz()
        );

        let mut enabled = self.transition(Enabled);
        enabled.effective_baudrate = effective_baudrate;
        Ok(enabled)
    }
}

impl<D: UartDevice, P: ValidUartPinout<D>, B: Bus> UartPeripheral<Enabled, D, P, B> {
    /// Disable this UART Peripheral, falling back to the Disabled state.
    pub fn disable(self) -> UartPeripheral<Disabled, D, P, B> {
        // Disable the UART, both TX and RX
        self.rb().modify_ctl(|ctl| {
            ctl.set_uarten(false);
            ctl.set_txe(false);
            ctl.set_rxe(false);
        });

        self.transition(Disabled)
    }

    /// The baud rate produced by the divisor, which can differ slightly from
    /// the configured one.
    pub fn effective_baudrate(&self) -> HertzU32 {
        self.effective_baudrate
    }

    /// Is there space in the UART TX FIFO for new data to be written?
    pub fn uart_is_writable(&self) -> bool {
        super::writer::uart_is_writable(&self.rb())
    }

    /// Is the UART still busy transmitting data?
    pub fn uart_is_busy(&self) -> bool {
        super::writer::uart_is_busy(&self.rb())
    }

    /// Is there data in the UART RX FIFO ready to be read?
    pub fn uart_is_readable(&self) -> bool {
        super::reader::is_readable(&self.rb())
    }

    /// Writes bytes to the UART.
    /// This function writes as long as it can. As soon that the FIFO is full, if :
    /// - 0 bytes were written, a WouldBlock Error is returned
    /// - some bytes were written, it is deemed to be a success
    ///
    /// Upon success, the remaining slice is returned.
    pub fn write_raw<'d>(&self, data: &'d [u8]) -> nb::Result<&'d [u8], Infallible> {
        super::writer::write_raw(&self.rb(), data)
    }

    /// Reads bytes from the UART.
    /// This function reads as long as it can. As soon that the FIFO is empty, if :
    /// - 0 bytes were read, a WouldBlock Error is returned
    /// - some bytes were read, it is deemed to be a success
    ///
    /// Upon success, it will return how many bytes were read.
    pub fn read_raw<'b>(&self, buffer: &'b mut [u8]) -> nb::Result<usize, ReadError<'b>> {
        super::reader::read_raw(&self.rb(), buffer)
    }

    /// Writes one byte to the UART.
    ///
    /// This function blocks until there is room for it in the TX FIFO.
    pub fn write_byte_blocking(&self, byte: u8) {
        super::writer::write_byte_blocking(&self.rb(), byte);
    }

    /// Reads one byte from the UART.
    ///
    /// This function blocks until a byte has been received.
    pub fn read_byte_blocking(&self) -> Result<u8, ReadErrorType> {
        super::reader::read_byte_blocking(&self.rb())
    }

    /// Writes bytes to the UART.
    ///
    /// This function blocks until the full buffer has been sent.
    pub fn write_full_blocking(&self, data: &[u8]) {
        super::writer::write_full_blocking(&self.rb(), data);
    }

    /// Reads bytes from the UART.
    ///
    /// This function blocks until the full buffer has been received.
    pub fn read_full_blocking(&self, buffer: &mut [u8]) -> Result<(), ReadErrorType> {
        super::reader::read_full_blocking(&self.rb(), buffer)
    }

    /// Writes a C string, without its terminator.
    ///
    /// No frame sentinel is appended, see [`write_frame`](Self::write_frame)
    /// for that.
    pub fn write_string(&self, s: &CStr) {
        super::writer::write_string(&self.rb(), s);
    }

    /// Writes `data` up to, not including, its first NUL byte (or all of it
    /// when there is none).
    pub fn write_nul_terminated(&self, data: &[u8]) {
        super::writer::write_nul_terminated(&self.rb(), data);
    }

    /// Writes `payload` as a string frame: the payload, then [`FRAME_SENTINEL`].
    ///
    /// A payload containing the sentinel is refused with
    /// [`FrameError::SentinelInPayload`] and nothing is sent.
    pub fn write_frame(&self, payload: &[u8]) -> Result<(), FrameError> {
        super::writer::write_frame(&self.rb(), payload)
    }

    /// Receives a string frame.
    ///
    /// Blocks until [`FRAME_SENTINEL`] is received. The payload is stored in
    /// `buffer` followed by a NUL byte, and its length is returned. The
    /// sentinel itself is consumed and never stored.
    ///
    /// When the payload and its terminator do not fit, the beginning of the
    /// payload is kept, the rest of the frame is read and dropped, and
    /// [`FrameError::Overflow`] is returned. After a line error nothing more is
    /// stored: the bytes before it are NUL terminated, the frame is read
    /// through its sentinel and [`FrameError::Read`] is returned.
    pub fn read_frame(&self, buffer: &mut [u8]) -> Result<usize, FrameError> {
        super::reader::read_frame(&self.rb(), buffer)
    }

    /// Receives a string frame into memory of unknown size.
    ///
    /// Prefer [`read_frame`](Self::read_frame). This variant stores every byte
    /// of the payload followed by a NUL byte at `buffer`, whatever the length
    /// of the frame, and returns the payload length. A line error ends the
    /// stored payload early and is returned once the sentinel has been read.
    ///
    /// # Safety
    ///
    /// `buffer` must be valid for writes of the whole incoming payload plus one
    /// byte. The peer alone decides how long the payload is.
    pub unsafe fn read_frame_unbounded(&self, buffer: *mut u8) -> Result<usize, ReadErrorType> {
        super::reader::read_frame_unbounded(&self.rb(), buffer)
    }

    /// Join the reader and writer halves together back into the original Uart peripheral.
    ///
    /// A reader/writer pair can be obtained by calling [`split`].
    ///
    /// [`split`]: #method.split
    pub fn join(reader: Reader<D, P, B>, writer: Writer<D, P, B>) -> Self {
        let _ = writer;
        Self {
            device: reader.device,
            _state: Enabled,
            pins: reader.pins,
            bus: reader.bus,
            effective_baudrate: reader.effective_baudrate,
            read_error: reader.read_error,
        }
    }
}

impl<D: UartDevice, P: ValidUartPinout<D>, B: Bus + Copy> UartPeripheral<Enabled, D, P, B> {
    /// Split this peripheral into a separate reader and writer.
    pub fn split(self) -> (Reader<D, P, B>, Writer<D, P, B>) {
        let reader = Reader {
            device: self.device,
            pins: self.pins,
            bus: self.bus,
            effective_baudrate: self.effective_baudrate,
            read_error: self.read_error,
        };
        // Safety: reader and writer will never write to the same address
        let device_copy = unsafe { D::steal() };
        let writer = Writer {
            _device: device_copy,
            bus: self.bus,
            pins: PhantomData,
        };
        (reader, writer)
    }
}

/// Baudrate configuration: loads both halves of the divisor.
///
/// The PL011 only latches them on the next line control write.
fn configure_baudrate<B: Bus>(rb: &RegisterBlock<'_, B>, divisor: BaudDivisor) {
    rb.write_divisor(divisor.integer, divisor.fractional);
}

/// Format configuration.
fn set_format<'w>(
    w: &'w mut Lcrh,
    data_bits: &DataBits,
    stop_bits: &StopBits,
    parity: &Option<Parity>,
) -> &'w mut Lcrh {
    match parity {
        Some(p) => {
            w.set_pen(true);
            match p {
                Parity::Odd => w.set_eps(false),
                Parity::Even => w.set_eps(true),
            };
        }
        None => {
            w.set_pen(false);
        }
    };

    w.set_wlen(data_bits.word_length_bits());

    match stop_bits {
        StopBits::One => w.set_stp2(false),
        StopBits::Two => w.set_stp2(true),
    };

    w
}

impl<D: UartDevice, P: ValidUartPinout<D>, B: Bus> eh0::Read<u8>
    for UartPeripheral<Enabled, D, P, B>
{
    type Error = ReadErrorType;

    fn read(&mut self) -> nb::Result<u8, Self::Error> {
        super::reader::read_one(&self.rb())
    }
}

impl<D: UartDevice, P: ValidUartPinout<D>, B: Bus> ErrorType
    for UartPeripheral<Enabled, D, P, B>
{
    type Error = ReadErrorType;
}

impl<D: UartDevice, P: ValidUartPinout<D>, B: Bus> Read<u8> for UartPeripheral<Enabled, D, P, B> {
    fn read(&mut self) -> nb::Result<u8, Self::Error> {
        super::reader::read_one(&self.rb())
    }
}

impl<D: UartDevice, P: ValidUartPinout<D>, B: Bus> eh0::Write<u8>
    for UartPeripheral<Enabled, D, P, B>
{
    type Error = Infallible;

    fn write(&mut self, word: u8) -> nb::Result<(), Self::Error> {
        if self.write_raw(&[word]).is_err() {
            Err(WouldBlock)
        } else {
            Ok(())
        }
    }

    fn flush(&mut self) -> nb::Result<(), Self::Error> {
        super::writer::transmit_flushed(&self.rb())
    }
}

impl<D: UartDevice, P: ValidUartPinout<D>, B: Bus> Write<u8>
    for UartPeripheral<Enabled, D, P, B>
{
    fn write(&mut self, word: u8) -> nb::Result<(), Self::Error> {
        if self.write_raw(&[word]).is_err() {
            Err(WouldBlock)
        } else {
            Ok(())
        }
    }

    fn flush(&mut self) -> nb::Result<(), Self::Error> {
        super::writer::transmit_flushed(&self.rb()).map_err(|e| match e {
            WouldBlock => WouldBlock,
            nb::Error::Other(v) => match v {},
        })
    }
}

impl<D: UartDevice, P: ValidUartPinout<D>, B: Bus> fmt::Write
    for UartPeripheral<Enabled, D, P, B>
{
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.write_full_blocking(s.as_bytes());
        Ok(())
    }
}

impl<D: UartDevice, P: ValidUartPinout<D>, B: Bus> embedded_io::ErrorType
    for UartPeripheral<Enabled, D, P, B>
{
    type Error = ReadErrorType;
}

impl<D: UartDevice, P: ValidUartPinout<D>, B: Bus> embedded_io::Read
    for UartPeripheral<Enabled, D, P, B>
{
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

impl<D: UartDevice, P: ValidUartPinout<D>, B: Bus> embedded_io::ReadReady
    for UartPeripheral<Enabled, D, P, B>
{
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(self.uart_is_readable() || self.read_error.is_some())
    }
}

impl<D: UartDevice, P: ValidUartPinout<D>, B: Bus> embedded_io::Write
    for UartPeripheral<Enabled, D, P, B>
{
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        // Blocks if and only if no bytes can be written.
        let remaining = match nb::block!(self.write_raw(buf)) {
            Ok(remaining) => remaining,
            Err(never) => match never {},
        };
        Ok(buf.len() - remaining.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        match nb::block!(super::writer::transmit_flushed(&self.rb())) {
            Ok(()) => Ok(()),
            Err(never) => match never {},
        }
    }
}

impl<D: UartDevice, P: ValidUartPinout<D>, B: Bus> embedded_io::WriteReady
    for UartPeripheral<Enabled, D, P, B>
{
    fn write_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(self.uart_is_writable())
    }
}
