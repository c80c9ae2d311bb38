//! Fractional baud-rate divisor of the PL011 baud-rate generator.

use fugit::HertzU32;

use super::{BaudRate, SpeedMode};

/// Number of bits in the fractional part of the divisor (UARTFBRD).
pub const FRACTION_BITS: u32 = 6;

/// Largest value the integer part of the divisor (UARTIBRD) can hold.
pub const MAX_INTEGER_DIVISOR: u32 = 0xFFFF;

const FRACTION_SCALE: u32 = 1 << FRACTION_BITS;

/// The two halves of the baud-rate divisor, ready for UARTIBRD / UARTFBRD.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BaudDivisor {
    /// Integer part, written to UARTIBRD.
    pub integer: u16,
    /// 6-bit fractional part, written to UARTFBRD.
    pub fractional: u8,
}

/// Why a divisor could not be derived from the reference clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DivisorError {
    /// The reference clock is too slow: the integer divisor would be zero.
    ClockTooSlow,
    /// The reference clock is too fast: the integer divisor exceeds 16 bits.
    ClockTooFast,
}

impl BaudDivisor {
    /// Computes the divisor producing `baudrate` from `reference`.
    ///
    /// With `d = oversampling * baudrate`, the integer part is `reference / d`
    /// and the fractional part is the remainder scaled to 1/64ths, rounded to
    /// the nearest step. When rounding reaches 64/64 it carries into the integer
    /// part, so `64 * integer + fractional` is always the nearest 6-bit fixed
    /// point value of `reference / d`.
    pub fn compute(
        reference: HertzU32,
        baudrate: BaudRate,
        mode: SpeedMode,
    ) -> Result<BaudDivisor, DivisorError> {
        let reference = reference.to_Hz();
        // Both factors are bounded by the enumerations: at most 16 * 1 MBd.
        let denominator = mode.oversampling() * baudrate.bits_per_second();

        let mut integer = reference / denominator;
        let remainder = reference % denominator;

        // remainder < denominator <= 16_000_000, so the scaled value fits in u64
        // but not necessarily in u32.
        let scaled = u64::from(remainder) * u64::from(FRACTION_SCALE) + u64::from(denominator / 2);
        let mut fractional = (scaled / u64::from(denominator)) as u32;

        if fractional == FRACTION_SCALE {
            integer += 1;
            fractional = 0;
        }

        match integer {
            0 => Err(DivisorError::ClockTooSlow),
            i if i > MAX_INTEGER_DIVISOR => Err(DivisorError::ClockTooFast),
            i => Ok(BaudDivisor {
                integer: i as u16,
                fractional: fractional as u8,
            }),
        }
    }

    /// The divisor as a single fixed-point value: `64 * integer + fractional`.
    pub const fn fixed_point(self) -> u32 {
        (self.integer as u32) * FRACTION_SCALE + self.fractional as u32
    }

    /// The baud rate the hardware actually produces with this divisor.
    pub fn effective_baudrate(self, reference: HertzU32, mode: SpeedMode) -> HertzU32 {
        let ticks = u64::from(mode.oversampling()) * u64::from(self.fixed_point());
        let rate = u64::from(reference.to_Hz()) * u64::from(FRACTION_SCALE) / ticks;
        HertzU32::from_raw(rate as u32)
    }
}
