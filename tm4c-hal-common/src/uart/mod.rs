//! Useful UART types and the register-independent parts of the UART setup.

mod divisor;
mod utils;

pub use divisor::*;
pub use utils::*;
