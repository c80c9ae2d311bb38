//! Module supporting type-level programming
//!
//! Only the sealing trait is needed: it keeps the set of UART devices, UART
//! states and pinouts closed to this crate.

mod private {
    /// Super trait used to mark traits with an exhaustive set of
    /// implementations
    pub trait Sealed {}
}

pub(crate) use private::Sealed;
