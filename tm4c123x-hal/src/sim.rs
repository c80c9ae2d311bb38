//! Host-side model of the registers this HAL touches
//!
//! [`SimBus`] implements [`Bus`] so the driver can run unmodified off-target.
//! It models:
//!
//! * plain read/write storage for every register without side effects;
//! * peripheral-ready registers that report a clock as ready a few reads
//!   after it has been gated on;
//! * both UARTs with their transmit and receive FIFOs, the flag register, and
//!   a line that carries transmitted bytes either to a capture buffer or to
//!   the other UART ([`SimBus::cross_connected`]).
//!
//! Simulated time only moves when a UART flag register is read: every such
//! read is one tick for the whole bus. On each tick every enabled transmitter
//! shifts one byte onto its line, then every enabled receiver moves one byte
//! that has spent long enough on its line into the receive FIFO.
//!
//! A line holds bytes until the receive FIFO has room. If the line itself is
//! full the byte is lost and the next delivered byte carries the overrun flag.

use core::cell::RefCell;

use heapless::{Deque, FnvIndexMap, Vec};

use crate::pac::{self, sysctl, uart, Block, Bus};

/// Depth of the PL011 transmit and receive FIFOs.
pub const FIFO_DEPTH: usize = 16;

/// Number of bytes a line can carry before it starts losing them.
pub const LINE_CAPACITY: usize = 512;

/// Number of accesses kept by [`SimBus::log`].
pub const LOG_CAPACITY: usize = 512;

/// Number of bytes kept per UART in the capture buffer.
pub const CAPTURE_CAPACITY: usize = 512;

const PR_DELAY: u32 = 2;

/// One recorded bus access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// A read of the register at the address.
    Read(u32),
    /// A write of the value to the register at the address.
    Write(u32, u32),
    /// A call to [`Bus::barrier`].
    Barrier,
}

/// Receive error a simulated byte can arrive with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineError {
    /// The stop bit was missing.
    Framing,
    /// The parity bit did not match.
    Parity,
    /// The line was held low for a whole frame.
    Break,
}

impl LineError {
    const fn dr_bits(self) -> u16 {
        match self {
            LineError::Framing => 1 << 8,
            LineError::Parity => 1 << 9,
            LineError::Break => 1 << 10,
        }
    }
}

const OVERRUN: u16 = 1 << 11;

#[derive(Debug, Clone, Copy)]
struct InFlight {
    word: u16,
    age: u32,
}

#[derive(Debug, Default)]
struct SimUart {
    tx_fifo: Deque<u8, FIFO_DEPTH>,
    rx_fifo: Deque<u16, FIFO_DEPTH>,
    line: Deque<InFlight, LINE_CAPACITY>,
    captured: Vec<u8, CAPTURE_CAPACITY>,
    overrun: bool,
}

#[derive(Debug, Default)]
struct State {
    registers: FnvIndexMap<u32, u32, 64>,
    uarts: [SimUart; 2],
    log: Vec<Access, LOG_CAPACITY>,
    pr_delay: u32,
    line_delay: u32,
    crossed: bool,
}

/// A simulated TM4C123x memory map.
#[derive(Debug)]
pub struct SimBus {
    state: RefCell<State>,
}

impl Default for SimBus {
    fn default() -> Self {
        Self::new()
    }
}

fn uart_index(addr: u32) -> Option<usize> {
    (0..2).find(|&index| uart_base(index) == addr & !0xFFF)
}

fn uart_base(index: usize) -> u32 {
    if index == 0 {
        pac::UART0::base()
    } else {
        pac::UART1::base()
    }
}

impl State {
    fn stored(&self, addr: u32) -> u32 {
        self.registers.get(&addr).copied().unwrap_or(0)
    }

    fn store(&mut self, addr: u32, value: u32) {
        // 64 slots are more than the driver ever touches.
        let _ = self.registers.insert(addr, value);
    }

    fn ctl(&self, index: usize) -> uart::Ctl {
        uart::Ctl::from_bits(self.stored(uart_base(index) + uart::CTL))
    }

    fn fifo_depth(&self, index: usize) -> usize {
        if uart::Lcrh::from_bits(self.stored(uart_base(index) + uart::LCRH)).fen() {
            FIFO_DEPTH
        } else {
            1
        }
    }

    fn tick(&mut self) {
        for index in 0..2 {
            let ctl = self.ctl(index);
            if !(ctl.uarten() && ctl.txe()) {
                continue;
            }
            if let Some(byte) = self.uarts[index].tx_fifo.pop_front() {
                let target = if ctl.lbe() {
                    Some(index)
                } else if self.crossed {
                    Some(1 - index)
                } else {
                    None
                };
                match target {
                    Some(target) => self.put_on_line(target, u16::from(byte)),
                    None => {
                        let _ = self.uarts[index].captured.push(byte);
                    }
                }
            }
        }

        for index in 0..2 {
            for in_flight in self.uarts[index].line.iter_mut() {
                in_flight.age = in_flight.age.saturating_add(1);
            }

            let ctl = self.ctl(index);
            if !(ctl.uarten() && ctl.rxe()) {
                continue;
            }
            let depth = self.fifo_depth(index);
            let line_delay = self.line_delay;
            let uart = &mut self.uarts[index];
            let arrived = uart
                .line
                .front()
                .is_some_and(|f| f.age > line_delay && uart.rx_fifo.len() < depth);
            if arrived {
                if let Some(in_flight) = uart.line.pop_front() {
                    let _ = uart.rx_fifo.push_back(in_flight.word);
                }
            }
        }
    }

    fn put_on_line(&mut self, index: usize, mut word: u16) {
        let uart = &mut self.uarts[index];
        if uart.overrun {
            word |= OVERRUN;
            uart.overrun = false;
        }
        if uart.line.push_back(InFlight { word, age: 0 }).is_err() {
            uart.overrun = true;
        }
    }

    fn flags(&self, index: usize) -> uart::Fr {
        let uart = &self.uarts[index];
        let depth = self.fifo_depth(index);
        let mut fr = uart::Fr::from_bits(0);
        fr.set_busy(!uart.tx_fifo.is_empty());
        fr.set_rxfe(uart.rx_fifo.is_empty());
        fr.set_txff(uart.tx_fifo.len() >= depth);
        fr.set_rxff(uart.rx_fifo.len() >= depth);
        fr.set_txfe(uart.tx_fifo.is_empty());
        fr
    }

    fn read(&mut self, addr: u32) -> u32 {
        if let Some(index) = uart_index(addr) {
            match addr - uart_base(index) {
                uart::FR => {
                    self.tick();
                    return self.flags(index).bits();
                }
                uart::DR => {
                    return self.uarts[index]
                        .rx_fifo
                        .pop_front()
                        .map(u32::from)
                        .unwrap_or(0);
                }
                _ => {}
            }
        }

        let sysctl_offset = addr.wrapping_sub(pac::SYSCTL::base());
        if sysctl_offset == sysctl::PRUART || sysctl_offset == sysctl::PRGPIO {
            if self.pr_delay > 0 {
                self.pr_delay -= 1;
                return 0;
            }
            let rcgc = if sysctl_offset == sysctl::PRUART {
                sysctl::RCGCUART
            } else {
                sysctl::RCGCGPIO
            };
            return self.stored(pac::SYSCTL::base() + rcgc);
        }

        self.stored(addr)
    }

    fn write(&mut self, addr: u32, value: u32) {
        if let Some(index) = uart_index(addr) {
            match addr - uart_base(index) {
                uart::DR => {
                    let depth = self.fifo_depth(index);
                    let fifo = &mut self.uarts[index].tx_fifo;
                    // A write to a full FIFO is dropped, as on the hardware.
                    if fifo.len() < depth {
                        let _ = fifo.push_back(value as u8);
                    }
                    return;
                }
                uart::FR => return,
                _ => {}
            }
        }

        let sysctl_offset = addr.wrapping_sub(pac::SYSCTL::base());
        if sysctl_offset == sysctl::RCGCUART || sysctl_offset == sysctl::RCGCGPIO {
            self.pr_delay = PR_DELAY;
        }

        self.store(addr, value);
    }

    fn record(&mut self, access: Access) {
        // Once the log is full further accesses are not recorded.
        let _ = self.log.push(access);
    }
}

impl SimBus {
    /// A memory map with every register at zero and nothing connected to the
    /// UART lines: transmitted bytes are captured, see [`SimBus::transmitted`].
    pub fn new() -> Self {
        SimBus {
            state: RefCell::new(State::default()),
        }
    }

    /// A memory map where the TX line of each UART is wired to the RX line of
    /// the other.
    pub fn cross_connected() -> Self {
        let bus = Self::new();
        bus.state.borrow_mut().crossed = true;
        bus
    }

    /// Number of ticks a byte spends on a line before it can be received.
    pub fn set_line_delay(&self, ticks: u32) {
        self.state.borrow_mut().line_delay = ticks;
    }

    /// Reads a register without side effects and without logging.
    pub fn peek(&self, addr: u32) -> u32 {
        self.state.borrow().stored(addr)
    }

    /// Puts `bytes` on the receive line of UART `index` (0 or 1).
    pub fn inject(&self, index: usize, bytes: &[u8]) {
        let mut state = self.state.borrow_mut();
        for &byte in bytes {
            state.put_on_line(index, u16::from(byte));
        }
    }

    /// Puts a byte that arrives with `error` on the receive line of UART `index`.
    pub fn inject_with_error(&self, index: usize, byte: u8, error: LineError) {
        self.state
            .borrow_mut()
            .put_on_line(index, u16::from(byte) | error.dr_bits());
    }

    /// Bytes UART `index` has shifted out while nothing was connected to it.
    pub fn transmitted(&self, index: usize) -> Vec<u8, CAPTURE_CAPACITY> {
        self.state.borrow().uarts[index].captured.clone()
    }

    /// Number of bytes waiting in the transmit FIFO of UART `index`.
    pub fn tx_fifo_len(&self, index: usize) -> usize {
        self.state.borrow().uarts[index].tx_fifo.len()
    }

    /// Lets simulated time pass until every transmit FIFO and line is empty or
    /// blocked by a full receive FIFO.
    pub fn settle(&self) {
        let mut state = self.state.borrow_mut();
        for _ in 0..(LINE_CAPACITY + FIFO_DEPTH) as u32 + state.line_delay + 1 {
            state.tick();
        }
    }

    /// The recorded accesses, oldest first.
    pub fn log(&self) -> Vec<Access, LOG_CAPACITY> {
        self.state.borrow().log.clone()
    }

    /// Forgets the recorded accesses.
    pub fn clear_log(&self) {
        self.state.borrow_mut().log.clear();
    }
}

impl Bus for SimBus {
    fn read(&self, addr: u32) -> u32 {
        let mut state = self.state.borrow_mut();
        state.record(Access::Read(addr));
        state.read(addr)
    }

    fn write(&self, addr: u32, value: u32) {
        let mut state = self.state.borrow_mut();
        state.record(Access::Write(addr, value));
        state.write(addr, value);
    }

    fn barrier(&self) {
        self.state.borrow_mut().record(Access::Barrier);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UART0_CTL: u32 = 0x4000_C000 + uart::CTL;
    const UART0_FR: u32 = 0x4000_C000 + uart::FR;
    const UART0_DR: u32 = 0x4000_C000 + uart::DR;
    const UART0_LCRH: u32 = 0x4000_C000 + uart::LCRH;

    fn enable(bus: &SimBus, base: u32) {
        let mut ctl = uart::Ctl::from_bits(0);
        ctl.set_uarten(true);
        ctl.set_txe(true);
        ctl.set_rxe(true);
        bus.write(base + uart::LCRH, 1 << 4);
        bus.write(base + uart::CTL, ctl.bits());
    }

    #[test]
    fn plain_registers_store_values() {
        let bus = SimBus::new();
        bus.write(0x4000_5420, 0x3);
        assert_eq!(bus.read(0x4000_5420), 0x3);
        assert_eq!(bus.peek(0x4000_5420), 0x3);
        assert_eq!(bus.peek(0x4000_5424), 0);
    }

    #[test]
    fn disabled_uart_does_not_transmit() {
        let bus = SimBus::new();
        bus.write(UART0_LCRH, 1 << 4);
        bus.write(UART0_DR, u32::from(b'a'));
        bus.read(UART0_FR);
        assert_eq!(bus.tx_fifo_len(0), 1);
        assert!(bus.transmitted(0).is_empty());
    }

    #[test]
    fn flag_reads_shift_bytes_out() {
        let bus = SimBus::new();
        enable(&bus, pac::UART0::base());
        bus.write(UART0_DR, u32::from(b'o'));
        bus.write(UART0_DR, u32::from(b'k'));

        assert!(!uart::Fr::from_bits(bus.read(UART0_FR)).txfe());
        assert!(uart::Fr::from_bits(bus.read(UART0_FR)).txfe());
        assert_eq!(bus.transmitted(0).as_slice(), b"ok");
    }

    #[test]
    fn without_fifo_the_transmitter_holds_one_byte() {
        let bus = SimBus::new();
        bus.write(UART0_CTL, 0);
        bus.write(UART0_DR, 1);
        assert!(uart::Fr::from_bits(bus.read(UART0_FR)).txff());
        bus.write(UART0_DR, 2);
        assert_eq!(bus.tx_fifo_len(0), 1);
    }

    #[test]
    fn receive_fifo_fills_then_reports_full() {
        let bus = SimBus::new();
        enable(&bus, pac::UART0::base());
        bus.inject(0, &[0x55; FIFO_DEPTH + 1]);
        bus.settle();
        let fr = uart::Fr::from_bits(bus.read(UART0_FR));
        assert!(fr.rxff());
        assert!(!fr.rxfe());
        for _ in 0..FIFO_DEPTH {
            assert_eq!(bus.read(UART0_DR), 0x55);
        }
        // The 17th byte waited on the line and arrives with the next tick.
        assert!(!uart::Fr::from_bits(bus.read(UART0_FR)).rxfe());
    }

    #[test]
    fn line_delay_postpones_arrival() {
        let bus = SimBus::new();
        enable(&bus, pac::UART0::base());
        bus.set_line_delay(3);
        bus.inject(0, b"x");
        let empty_reads = (0..10)
            .take_while(|_| uart::Fr::from_bits(bus.read(UART0_FR)).rxfe())
            .count();
        assert_eq!(empty_reads, 3);
    }

    #[test]
    fn errors_travel_with_the_byte() {
        let bus = SimBus::new();
        enable(&bus, pac::UART0::base());
        bus.inject_with_error(0, 0x42, LineError::Parity);
        bus.read(UART0_FR);
        let dr = uart::Dr::from_bits(bus.read(UART0_DR));
        assert_eq!(dr.data(), 0x42);
        assert!(dr.pe());
        assert!(!dr.fe());
    }

    #[test]
    fn barrier_and_accesses_are_logged() {
        let bus = SimBus::new();
        bus.write(0x10, 1);
        bus.read(0x10);
        bus.barrier();
        assert_eq!(
            bus.log().as_slice(),
            &[Access::Write(0x10, 1), Access::Read(0x10), Access::Barrier]
        );
        bus.clear_log();
        assert!(bus.log().is_empty());
    }
}
