//! General Purpose Input and Output (GPIO)
//!
//! Only what the UART needs: handing a pin over to one of its alternate
//! (peripheral) functions. Ports are accessed through the APB aperture.
//!
//! See [Chapter 10](https://www.ti.com/lit/ds/symlink/tm4c123gh6pm.pdf) of the
//! datasheet for the register descriptions, and Table 23-5 for the function
//! numbers each pin supports.

use crate::pac::{gpio::*, Block, Bus, GPIO_PORTA, GPIO_PORTB, GPIO_PORTC};
use crate::sysctl::Gate;

/// A GPIO port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Port {
    /// Port A
    A,
    /// Port B
    B,
    /// Port C
    C,
}

impl Port {
    /// Base address of the port's registers on the APB.
    pub fn base(self) -> u32 {
        match self {
            Port::A => GPIO_PORTA::base(),
            Port::B => GPIO_PORTB::base(),
            Port::C => GPIO_PORTC::base(),
        }
    }

    pub(crate) const fn gate(self) -> Gate {
        Gate::gpio(self as u32)
    }
}

/// Connects `pin` of `port` to alternate function `function`.
///
/// Sets the pin's AFSEL bit, writes `function` into its PCTL nibble, enables
/// the digital function and disables the analog one. Other pins of the port
/// are left alone. The port clock must already be running.
pub fn route_alternate_function<B: Bus>(bus: &B, port: Port, pin: u8, function: u8) {
    let base = port.base();
    let mask = 1u32 << pin;
    let shift = u32::from(pin) * 4;

    #[cfg(feature = "defmt")]
    defmt::trace!("P{}{}: alternate function {}", port, pin, function);

    bus.set_bits(base + AFSEL, mask);
    bus.modify(base + PCTL, |pctl| {
        (pctl & !(0xF << shift)) | (u32::from(function & 0xF) << shift)
    });
    bus.set_bits(base + DEN, mask);
    bus.clear_bits(base + AMSEL, mask);
}
