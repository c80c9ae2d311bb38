use crate::gpio::Port;
use crate::pac::{UART0, UART1};
use crate::typelevel::Sealed;

use super::UartDevice;

/// Declares a valid UART pinout.
///
/// The following pinouts are valid:
///
/// |UART |     TX      |     RX      | function |
/// |-----|-------------|-------------|----------|
/// |UART0| PA1         | PA0         | 1        |
/// |UART1| PB1         | PB0         | 1        |
/// |UART1| PC5         | PC4         | 2        |
pub trait ValidUartPinout<UART: UartDevice>: Sealed {
    /// Port both pins belong to.
    const PORT: Port;
    /// Pin number of the transmit line.
    const TX: u8;
    /// Pin number of the receive line.
    const RX: u8;
    /// Alternate function selecting the UART on both pins (PCTL nibble).
    const FUNCTION: u8;
}

macro_rules! impl_valid_uart {
    ($($(#[$attr:meta])* $pins:ident: $uart:ident, $port:ident, tx: $tx:expr, rx: $rx:expr, function: $function:expr;)*) => {
        $(
            $(#[$attr])*
            #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
            pub struct $pins;

            impl Sealed for $pins {}

            impl ValidUartPinout<$uart> for $pins {
                const PORT: Port = Port::$port;
                const TX: u8 = $tx;
                const RX: u8 = $rx;
                const FUNCTION: u8 = $function;
            }
        )*
    };
}

impl_valid_uart!(
    /// UART0 on PA0 (RX) and PA1 (TX), the ICDI virtual COM port on the LaunchPad.
    PinsA0A1: UART0, A, tx: 1, rx: 0, function: 1;
    /// UART1 on PB0 (RX) and PB1 (TX).
    PinsB0B1: UART1, B, tx: 1, rx: 0, function: 1;
    /// UART1 on PC4 (RX) and PC5 (TX).
    PinsC4C5: UART1, C, tx: 5, rx: 4, function: 2;
);

#[cfg(test)]
mod tests {
    use super::*;

    fn pinout<D: UartDevice, P: ValidUartPinout<D>>(_: P) -> (Port, u8, u8, u8) {
        (P::PORT, P::TX, P::RX, P::FUNCTION)
    }

    #[test]
    fn pinouts_match_the_pin_mux_table() {
        assert_eq!(pinout::<UART0, _>(PinsA0A1), (Port::A, 1, 0, 1));
        assert_eq!(pinout::<UART1, _>(PinsB0B1), (Port::B, 1, 0, 1));
        assert_eq!(pinout::<UART1, _>(PinsC4C5), (Port::C, 5, 4, 2));
    }
}
