use super::{BaudRate, DataBits, StopBits, UartConfig};

/// 9600 baud, 8 data bits, no parity, 1 stop bit
pub const _9600_8_N_1: UartConfig =
    UartConfig::new(BaudRate::Baud9600, DataBits::Eight, None, StopBits::One);

/// 19200 baud, 8 data bits, no parity, 1 stop bit
pub const _19200_8_N_1: UartConfig =
    UartConfig::new(BaudRate::Baud19200, DataBits::Eight, None, StopBits::One);

/// 38400 baud, 8 data bits, no parity, 1 stop bit
pub const _38400_8_N_1: UartConfig =
    UartConfig::new(BaudRate::Baud38400, DataBits::Eight, None, StopBits::One);

/// 57600 baud, 8 data bits, no parity, 1 stop bit
pub const _57600_8_N_1: UartConfig =
    UartConfig::new(BaudRate::Baud57600, DataBits::Eight, None, StopBits::One);

/// 115200 baud, 8 data bits, no parity, 1 stop bit
pub const _115200_8_N_1: UartConfig =
    UartConfig::new(BaudRate::Baud115200, DataBits::Eight, None, StopBits::One);
