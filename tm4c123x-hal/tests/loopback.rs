//! Two UARTs wired back to back through the simulated bus.

use proptest::prelude::*;
use tm4c123x_hal::{
    pac::{self, UART0, UART1},
    sim::SimBus,
    uart::{
        self, DataBits, Enabled, FrameError, Parity, PinsA0A1, PinsB0B1, StopBits, UartConfig,
        UartPeripheral,
    },
};

type Uart0<'b> = UartPeripheral<Enabled, UART0, PinsA0A1, &'b SimBus>;
type Uart1<'b> = UartPeripheral<Enabled, UART1, PinsB0B1, &'b SimBus>;

fn pair<'b>(bus: &'b SimBus, config: &UartConfig) -> (Uart0<'b>, Uart1<'b>) {
    let mut p = unsafe { pac::Peripherals::steal() };
    let uart0 = UartPeripheral::new(p.UART0, PinsA0A1, bus, &mut p.SYSCTL)
        .enable(config, uart::REFERENCE_CLOCK)
        .unwrap();
    let uart1 = UartPeripheral::new(p.UART1, PinsB0B1, bus, &mut p.SYSCTL)
        .enable(config, uart::REFERENCE_CLOCK)
        .unwrap();
    (uart0, uart1)
}

fn frame_payload() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(
        any::<u8>().prop_filter("no terminator", |b| *b != 0 && *b != uart::FRAME_SENTINEL),
        0..96,
    )
}

proptest! {
    #[test]
    fn buffer_arrives_unchanged(data in prop::collection::vec(any::<u8>(), 0..256)) {
        let bus = SimBus::cross_connected();
        let (uart0, uart1) = pair(&bus, &UartConfig::default());

        uart0.write_full_blocking(&data);
        let mut received = vec![0; data.len()];
        uart1.read_full_blocking(&mut received).unwrap();

        prop_assert_eq!(received, data);
        prop_assert!(!uart1.uart_is_readable());
    }

    #[test]
    fn nul_terminated_string_reads_back_as_a_frame(payload in frame_payload()) {
        let bus = SimBus::cross_connected();
        let (uart0, uart1) = pair(&bus, &UartConfig::default());

        let mut string = payload.clone();
        string.push(0);
        uart1.write_nul_terminated(&string);
        uart1.write_byte_blocking(uart::FRAME_SENTINEL);

        let mut buffer = [0xFF; 128];
        let len = uart0.read_frame(&mut buffer).unwrap();

        prop_assert_eq!(&buffer[..len], &payload[..]);
        prop_assert_eq!(buffer[len], 0);
        prop_assert!(!buffer[..=len].contains(&uart::FRAME_SENTINEL));
    }

    #[test]
    fn oversized_frames_resynchronise(payload in frame_payload(), capacity in 1usize..16) {
        let bus = SimBus::cross_connected();
        let (uart0, uart1) = pair(&bus, &UartConfig::default());

        uart0.write_frame(&payload).unwrap();
        uart0.write_frame(b"next").unwrap();

        let mut buffer = vec![0xFF; capacity];
        let stored = payload.len().min(capacity - 1);
        match uart1.read_frame(&mut buffer) {
            Ok(len) => prop_assert!(len == payload.len() && len < capacity),
            Err(error) => prop_assert_eq!(
                error,
                FrameError::Overflow { stored, discarded: payload.len() - stored }
            ),
        }
        prop_assert_eq!(&buffer[..stored], &payload[..stored]);
        prop_assert_eq!(buffer[stored], 0);

        let mut next = [0; 8];
        prop_assert_eq!(uart1.read_frame(&mut next), Ok(4));
        prop_assert_eq!(&next[..5], b"next\0");
    }
}

#[test]
fn every_line_format_round_trips() {
    let formats = [
        (DataBits::Eight, None, StopBits::One),
        (DataBits::Seven, Some(Parity::Even), StopBits::One),
        (DataBits::Eight, Some(Parity::Odd), StopBits::Two),
    ];
    for (data_bits, parity, stop_bits) in formats {
        let config = UartConfig::new(uart::BaudRate::Baud2400, data_bits, parity, stop_bits);
        let bus = SimBus::cross_connected();
        let (uart0, uart1) = pair(&bus, &config);

        uart1.write_full_blocking(b"ABC");
        let mut received = [0; 3];
        uart0.read_full_blocking(&mut received).unwrap();
        assert_eq!(&received, b"ABC");
    }
}

#[test]
fn sentinel_in_payload_sends_nothing() {
    let bus = SimBus::cross_connected();
    let (uart0, uart1) = pair(&bus, &UartConfig::default());

    assert_eq!(uart0.write_frame(b"1#2"), Err(FrameError::SentinelInPayload));
    bus.settle();
    assert!(!uart1.uart_is_readable());
}

#[test]
fn legacy_unbounded_frame() {
    let bus = SimBus::cross_connected();
    let (uart0, uart1) = pair(&bus, &UartConfig::default());

    uart0.write_string(c"status:ok");
    uart0.write_byte_blocking(b'#');

    let mut buffer = [0xFF; 64];
    let len = unsafe { uart1.read_frame_unbounded(buffer.as_mut_ptr()) }.unwrap();
    assert_eq!(&buffer[..=len], b"status:ok\0");
}

#[test]
fn split_halves_talk_across() {
    let bus = SimBus::cross_connected();
    let (uart0, uart1) = pair(&bus, &UartConfig::default());
    let (rx0, tx0) = uart0.split();
    let (rx1, tx1) = uart1.split();

    tx0.write_full_blocking(b"left");
    tx1.write_full_blocking(b"right");

    let mut left = [0; 4];
    let mut right = [0; 5];
    rx1.read_full_blocking(&mut left).unwrap();
    rx0.read_full_blocking(&mut right).unwrap();
    assert_eq!(&left, b"left");
    assert_eq!(&right, b"right");

    let uart0 = UartPeripheral::join(rx0, tx0);
    let (_device, _pins, _bus) = uart0.disable().free();
}

#[test]
fn peripherals_are_handed_out_once() {
    // Other tests of this binary may have stolen them already.
    let _first = pac::Peripherals::take();
    assert!(pac::Peripherals::take().is_none());
}
