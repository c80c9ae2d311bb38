//! Useful UART types

use fugit::HertzU32;

/// Data bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataBits {
    /// 5 bits
    Five,
    /// 6 bits
    Six,
    /// 7 bits
    Seven,
    /// 8 bits
    Eight,
}

impl DataBits {
    /// The UARTLCRH WLEN encoding: 0b00 for 5 bits up to 0b11 for 8 bits.
    pub const fn word_length_bits(self) -> u8 {
        match self {
            DataBits::Five => 0b00,
            DataBits::Six => 0b01,
            DataBits::Seven => 0b10,
            DataBits::Eight => 0b11,
        }
    }
}

/// Stop bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StopBits {
    /// 1 bit
    One,
    /// 2 bits
    Two,
}

/// Parity
///
/// The "none" state of parity is represented with the Option type (None).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Parity {
    /// Odd parity
    Odd,
    /// Even parity
    Even,
}

/// Oversampling applied by the baud-rate generator.
///
/// High-speed mode halves the number of reference clock ticks per bit, which
/// doubles the highest reachable baud rate at the cost of noise immunity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SpeedMode {
    /// 16 clock ticks per bit.
    #[default]
    Standard,
    /// 8 clock ticks per bit.
    HighSpeed,
}

impl SpeedMode {
    /// Number of reference clock ticks sampled per transmitted bit.
    pub const fn oversampling(self) -> u32 {
        match self {
            SpeedMode::Standard => 16,
            SpeedMode::HighSpeed => 8,
        }
    }
}

/// The baud rates this driver supports.
///
/// Restricting the rate to an enumeration keeps a zero baud rate (and the
/// division by zero that would follow) unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u32)]
pub enum BaudRate {
    /// 2400 Bd
    Baud2400 = 2_400,
    /// 4800 Bd
    Baud4800 = 4_800,
    /// 9600 Bd
    Baud9600 = 9_600,
    /// 14400 Bd
    Baud14400 = 14_400,
    /// 19200 Bd
    Baud19200 = 19_200,
    /// 28800 Bd
    Baud28800 = 28_800,
    /// 38400 Bd
    Baud38400 = 38_400,
    /// 57600 Bd
    Baud57600 = 57_600,
    /// 76800 Bd
    Baud76800 = 76_800,
    /// 115200 Bd
    Baud115200 = 115_200,
    /// 230400 Bd
    Baud230400 = 230_400,
    /// 250 kBd
    Baud250K = 250_000,
    /// 500 kBd
    Baud500K = 500_000,
    /// 1 MBd
    Baud1M = 1_000_000,
}

impl BaudRate {
    /// Every supported rate, slowest first.
    pub const ALL: [BaudRate; 14] = [
        BaudRate::Baud2400,
        BaudRate::Baud4800,
        BaudRate::Baud9600,
        BaudRate::Baud14400,
        BaudRate::Baud19200,
        BaudRate::Baud28800,
        BaudRate::Baud38400,
        BaudRate::Baud57600,
        BaudRate::Baud76800,
        BaudRate::Baud115200,
        BaudRate::Baud230400,
        BaudRate::Baud250K,
        BaudRate::Baud500K,
        BaudRate::Baud1M,
    ];

    /// The rate in bits per second.
    pub const fn bits_per_second(self) -> u32 {
        self as u32
    }

    /// The rate as a frequency.
    pub const fn to_hertz(self) -> HertzU32 {
        HertzU32::from_raw(self as u32)
    }
}

/// A struct holding the configuration for an UART device.
///
/// The `Default` implementation implements the following values:
/// ```ignore
/// # // can't actually create this with the non_exhaustive attribute
/// UartConfig {
///    baudrate: BaudRate::Baud115200,
///    data_bits: DataBits::Eight,
///    stop_bits: StopBits::One,
///    parity: None,
///    speed_mode: SpeedMode::Standard,
///}
/// ```
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UartConfig {
    /// The baudrate the uart will run at.
    pub baudrate: BaudRate,

    /// The amount of data bits the uart should be configured to.
    pub data_bits: DataBits,

    /// The amount of stop bits the uart should be configured to.
    pub stop_bits: StopBits,

    /// The parity that this uart should have
    pub parity: Option<Parity>,

    /// Oversampling used by the baud-rate generator.
    pub speed_mode: SpeedMode,
}

impl UartConfig {
    /// Create a new instance of UartConfig, sampling in standard (16x) mode.
    pub const fn new(
        baudrate: BaudRate,
        data_bits: DataBits,
        parity: Option<Parity>,
        stop_bits: StopBits,
    ) -> UartConfig {
        UartConfig {
            baudrate,
            data_bits,
            stop_bits,
            parity,
            speed_mode: SpeedMode::Standard,
        }
    }

    /// Returns the same configuration with another sampling mode.
    pub const fn with_speed_mode(mut self, speed_mode: SpeedMode) -> UartConfig {
        self.speed_mode = speed_mode;
        self
    }
}

impl Default for UartConfig {
    fn default() -> Self {
        Self {
            baudrate: BaudRate::Baud115200,
            data_bits: DataBits::Eight,
            stop_bits: StopBits::One,
            parity: None,
            speed_mode: SpeedMode::Standard,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baud_rates_are_sorted_and_positive() {
        let rates = BaudRate::ALL.map(BaudRate::bits_per_second);
        assert_eq!(rates[0], 2_400);
        assert_eq!(rates[rates.len() - 1], 1_000_000);
        assert!(rates.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn default_is_115200_8n1_standard() {
        let config = UartConfig::default();
        assert_eq!(config.baudrate.to_hertz(), HertzU32::from_raw(115_200));
        assert_eq!(config.data_bits, DataBits::Eight);
        assert_eq!(config.stop_bits, StopBits::One);
        assert_eq!(config.parity, None);
        assert_eq!(config.speed_mode.oversampling(), 16);
    }

    #[test]
    fn speed_mode_override() {
        let config = UartConfig::new(
            BaudRate::Baud9600,
            DataBits::Seven,
            Some(Parity::Odd),
            StopBits::Two,
        )
        .with_speed_mode(SpeedMode::HighSpeed);
        assert_eq!(config.speed_mode.oversampling(), 8);
        assert_eq!(config.parity, Some(Parity::Odd));
    }

    #[test]
    fn word_length_encoding() {
        let encoded = [DataBits::Five, DataBits::Six, DataBits::Seven, DataBits::Eight]
            .map(DataBits::word_length_bits);
        assert_eq!(encoded, [0b00, 0b01, 0b10, 0b11]);
    }
}
