//! Run-mode clock gating
// See [Section 5.2.6](https://www.ti.com/lit/ds/symlink/tm4c123gh6pm.pdf) for more details
use crate::pac::{self, sysctl::*, Block, Bus};

/// One peripheral's bit in a Run Mode Clock Gating Control register and in
/// the matching Peripheral Ready register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gate {
    rcgc: u32,
    pr: u32,
    bit: u32,
}

impl Gate {
    pub(crate) const fn gpio(port: u32) -> Gate {
        Gate {
            rcgc: RCGCGPIO,
            pr: PRGPIO,
            bit: port,
        }
    }

    fn enable<B: Bus>(&self, bus: &B) {
        bus.set_bits(pac::SYSCTL::base() + self.rcgc, 1 << self.bit);
    }

    fn is_ready<B: Bus>(&self, bus: &B) -> bool {
        bus.read(pac::SYSCTL::base() + self.pr) & (1 << self.bit) != 0
    }
}

mod private {
    pub trait ClockGate {
        fn gate(&self) -> super::Gate;
    }
}

pub(crate) use private::ClockGate;

macro_rules! generate_clock_gate {
    ($PERIPH:ident, $rcgc:ident, $pr:ident, $bit:expr) => {
        impl ClockGate for pac::$PERIPH {
            fn gate(&self) -> Gate {
                Gate {
                    rcgc: $rcgc,
                    pr: $pr,
                    bit: $bit,
                }
            }
        }
    };
}

generate_clock_gate!(UART0, RCGCUART, PRUART, 0);
generate_clock_gate!(UART1, RCGCUART, PRUART, 1);

/// Turns on the clocks of `gates`, in order, and waits until they are usable.
///
/// Register writes issued in the first cycles after a clock is gated on are
/// lost. A clock gating register is read back and the bus drained before
/// polling the peripheral-ready bits.
pub(crate) fn enable_clocks<B: Bus>(bus: &B, _sysctl: &mut pac::SYSCTL, gates: &[Gate]) {
    for gate in gates {
        gate.enable(bus);
    }

    let _ = bus.read(pac::SYSCTL::base() + RCGCGPIO);
    bus.barrier();

    for gate in gates {
        while !gate.is_ready(bus) {
            core::hint::spin_loop();
        }
    }
}
