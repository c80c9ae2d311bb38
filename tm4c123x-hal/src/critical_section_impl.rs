//! Critical sections for the single Cortex-M4F core of the TM4C123x
//!
//! Masking interrupts through PRIMASK is enough: there is no second core to
//! exclude. The saved state is whether interrupts were enabled on entry, so
//! nested critical sections only re-enable them on the way out of the
//! outermost one.

struct Tm4cCriticalSection;
critical_section::set_impl!(Tm4cCriticalSection);

unsafe impl critical_section::Impl for Tm4cCriticalSection {
    unsafe fn acquire() -> critical_section::RawRestoreState {
        let was_active = cortex_m::register::primask::read().is_active();
        cortex_m::interrupt::disable();
        was_active
    }

    unsafe fn release(was_active: critical_section::RawRestoreState) {
        if was_active {
            cortex_m::interrupt::enable();
        }
    }
}
