//! Register access for the TM4C123GH6PM blocks this HAL drives
//!
//! The layout follows the TM4C123GH6PM datasheet (SPMS376E): System Control
//! (§5.5), GPIO (§10.5) and UART (§14.6). Registers are not dereferenced
//! directly. Every access goes through a [`Bus`]: on the microcontroller that
//! is [`Direct`], which performs volatile accesses to the memory map; on the
//! host it is the simulator in `crate::sim`.
//!
//! Peripheral ownership is tracked by the tokens of the `tm4c123x` device
//! crate, handed out once by [`Peripherals::take`]. Their register block
//! pointers give the base addresses used on the bus.

use vcell::VolatileCell;

/// Word-sized access to the peripheral memory map.
pub trait Bus {
    /// Reads the 32-bit register at `addr`.
    fn read(&self, addr: u32) -> u32;

    /// Writes `value` to the 32-bit register at `addr`.
    fn write(&self, addr: u32, value: u32);

    /// Read-modify-write of the register at `addr`.
    fn modify<F: FnOnce(u32) -> u32>(&self, addr: u32, f: F) {
        let value = self.read(addr);
        self.write(addr, f(value));
    }

    /// Sets `bits` in the register at `addr`, leaving the other bits alone.
    fn set_bits(&self, addr: u32, bits: u32) {
        self.modify(addr, |v| v | bits);
    }

    /// Clears `bits` in the register at `addr`, leaving the other bits alone.
    fn clear_bits(&self, addr: u32, bits: u32) {
        self.modify(addr, |v| v & !bits);
    }

    /// Completes all outstanding bus accesses before the next one starts.
    fn barrier(&self) {}
}

impl<B: Bus> Bus for &B {
    fn read(&self, addr: u32) -> u32 {
        (**self).read(addr)
    }

    fn write(&self, addr: u32, value: u32) {
        (**self).write(addr, value)
    }

    fn barrier(&self) {
        (**self).barrier()
    }
}

/// Volatile access to the real memory map.
#[derive(Debug, Clone, Copy)]
pub struct Direct {
    _private: (),
}

impl Direct {
    /// Creates a handle to the memory map.
    ///
    /// # Safety
    ///
    /// The code must run on a TM4C123x, where every address this HAL derives
    /// from the constants of this module is a valid peripheral register.
    pub const unsafe fn new() -> Self {
        Direct { _private: () }
    }

    fn cell(addr: u32) -> &'static VolatileCell<u32> {
        // Safety: `Direct` can only be created on a target whose memory map
        // matches this module, and peripheral registers live forever.
        unsafe { &*(addr as usize as *const VolatileCell<u32>) }
    }
}

impl Bus for Direct {
    fn read(&self, addr: u32) -> u32 {
        Self::cell(addr).get()
    }

    fn write(&self, addr: u32, value: u32) {
        Self::cell(addr).set(value)
    }

    fn barrier(&self) {
        #[cfg(target_arch = "arm")]
        cortex_m::asm::dsb();
    }
}

pub use tm4c123x::{Peripherals, GPIO_PORTA, GPIO_PORTB, GPIO_PORTC, SYSCTL, UART0, UART1};

/// A peripheral whose registers are reached through a [`Bus`].
pub trait Block {
    /// Address of the peripheral's register block.
    fn base() -> u32;
}

macro_rules! impl_block {
    ($($PERIPH:ident),*) => {
        $(
            impl Block for $PERIPH {
                fn base() -> u32 {
                    $PERIPH::ptr() as usize as u32
                }
            }
        )*
    };
}

impl_block!(SYSCTL, UART0, UART1, GPIO_PORTA, GPIO_PORTB, GPIO_PORTC);

/// System Control registers (offsets from the [`SYSCTL`] block).
pub mod sysctl {
    /// General-Purpose Input/Output Run Mode Clock Gating Control.
    pub const RCGCGPIO: u32 = 0x608;
    /// UART Run Mode Clock Gating Control.
    pub const RCGCUART: u32 = 0x618;
    /// General-Purpose Input/Output Peripheral Ready.
    pub const PRGPIO: u32 = 0xA08;
    /// UART Peripheral Ready.
    pub const PRUART: u32 = 0xA18;
}

/// GPIO registers (offsets from the port base address).
pub mod gpio {
    /// Alternate Function Select.
    pub const AFSEL: u32 = 0x420;
    /// Digital Enable.
    pub const DEN: u32 = 0x51C;
    /// Analog Mode Select.
    pub const AMSEL: u32 = 0x528;
    /// Port Control: one 4-bit function selector per pin.
    pub const PCTL: u32 = 0x52C;
}

/// UART registers (offsets from the UART base address) and their bit layout.
pub mod uart {
    use bitfield::bitfield;

    /// Data.
    pub const DR: u32 = 0x000;
    /// Flag.
    pub const FR: u32 = 0x018;
    /// Integer Baud-Rate Divisor.
    pub const IBRD: u32 = 0x024;
    /// Fractional Baud-Rate Divisor.
    pub const FBRD: u32 = 0x028;
    /// Line Control.
    pub const LCRH: u32 = 0x02C;
    /// Control.
    pub const CTL: u32 = 0x030;

    bitfield! {
        /// UARTDR as read: the received byte and its error flags.
        #[derive(Clone, Copy, PartialEq, Eq, Default)]
        pub struct Dr(u32);
        impl Debug;
        /// Received or transmitted data.
        pub u8, data, set_data: 7, 0;
        /// Framing error.
        pub fe, _: 8;
        /// Parity error.
        pub pe, _: 9;
        /// Break error.
        pub be, _: 10;
        /// Overrun error.
        pub oe, _: 11;
    }

    bitfield! {
        /// UARTFR.
        #[derive(Clone, Copy, PartialEq, Eq, Default)]
        pub struct Fr(u32);
        impl Debug;
        /// UART busy transmitting.
        pub busy, set_busy: 3;
        /// Receive FIFO empty.
        pub rxfe, set_rxfe: 4;
        /// Transmit FIFO full.
        pub txff, set_txff: 5;
        /// Receive FIFO full.
        pub rxff, set_rxff: 6;
        /// Transmit FIFO empty.
        pub txfe, set_txfe: 7;
    }

    bitfield! {
        /// UARTLCRH.
        #[derive(Clone, Copy, PartialEq, Eq, Default)]
        pub struct Lcrh(u32);
        impl Debug;
        /// Send break.
        pub brk, set_brk: 0;
        /// Parity enable.
        pub pen, set_pen: 1;
        /// Even parity select.
        pub eps, set_eps: 2;
        /// Two stop bits select.
        pub stp2, set_stp2: 3;
        /// FIFO enable.
        pub fen, set_fen: 4;
        /// Word length, 0b00 = 5 bits up to 0b11 = 8 bits.
        pub u8, wlen, set_wlen: 6, 5;
        /// Stick parity select.
        pub sps, set_sps: 7;
    }

    bitfield! {
        /// UARTCTL.
        #[derive(Clone, Copy, PartialEq, Eq, Default)]
        pub struct Ctl(u32);
        impl Debug;
        /// UART enable.
        pub uarten, set_uarten: 0;
        /// High-speed enable: 8x instead of 16x oversampling.
        pub hse, set_hse: 5;
        /// Loop back enable.
        pub lbe, set_lbe: 7;
        /// Transmit enable.
        pub txe, set_txe: 8;
        /// Receive enable.
        pub rxe, set_rxe: 9;
    }

    macro_rules! raw_bits {
        ($($reg:ident),*) => {
            $(
                impl $reg {
                    /// Wraps a raw register value.
                    pub const fn from_bits(bits: u32) -> Self {
                        $reg(bits)
                    }

                    /// The raw register value.
                    pub const fn bits(self) -> u32 {
                        self.0
                    }
                }
            )*
        };
    }

    raw_bits!(Dr, Fr, Lcrh, Ctl);
}
