//! Interrupt-masked critical sections.
//!
//! The process core runs on one CPU, so the only concurrency is interrupt
//! preemption. Every mutation of shared state (process table, PCBs,
//! terminal slots) happens with the interrupt line masked for its duration.
//! There are no queue-based waits; blocking I/O spins through
//! [`CpuPort::idle_until_interrupt`](crate::platform::CpuPort::idle_until_interrupt).

/// Hardware interrupt-mask collaborator.
///
/// Implemented by the interrupt-controller shim. On real hardware this is
/// `cli`/`sti`; in tests it is a counter.
pub trait InterruptMask {
    /// Mask maskable interrupts. Returns whether they were enabled before.
    fn disable(&self) -> bool;

    /// Unmask maskable interrupts.
    fn enable(&self);
}

/// RAII guard for a masked region. Restores the previous mask state on
/// drop, so nested guards are safe.
pub struct IrqGuard<'a, M: InterruptMask> {
    mask: &'a M,
    was_enabled: bool,
}

impl<'a, M: InterruptMask> IrqGuard<'a, M> {
    pub fn new(mask: &'a M) -> Self {
        let was_enabled = mask.disable();
        IrqGuard { mask, was_enabled }
    }
}

impl<M: InterruptMask> Drop for IrqGuard<'_, M> {
    fn drop(&mut self) {
        if self.was_enabled {
            self.mask.enable();
        }
    }
}

/// Owner of a piece of kernel state that may only be touched inside a
/// critical section.
///
/// Combines an interrupt mask with a spinlock. The lock is uncontended on a
/// single CPU once interrupts are masked; it exists so that a re-entrant
/// access from a mis-nested interrupt path deadlocks loudly instead of
/// corrupting state silently.
pub struct IrqCell<M: InterruptMask, T> {
    mask: M,
    inner: spin::Mutex<T>,
}

impl<M: InterruptMask, T> IrqCell<M, T> {
    pub const fn new(mask: M, value: T) -> Self {
        IrqCell {
            mask,
            inner: spin::Mutex::new(value),
        }
    }

    /// Run `f` with interrupts masked and the state locked.
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let _irq = IrqGuard::new(&self.mask);
        let mut guard = self.inner.lock();
        f(&mut guard)
    }

    /// Lock without masking. Only valid while interrupts are already
    /// masked by the caller (e.g. inside an interrupt handler).
    pub fn lock_in_interrupt(&self) -> spin::MutexGuard<'_, T> {
        self.inner.lock()
    }

    /// Consume the cell, returning the inner state.
    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;

    struct FlagMask {
        enabled: Cell<bool>,
    }

    impl FlagMask {
        fn new() -> Self {
            FlagMask {
                enabled: Cell::new(true),
            }
        }
    }

    impl InterruptMask for FlagMask {
        fn disable(&self) -> bool {
            let was = self.enabled.get();
            self.enabled.set(false);
            was
        }

        fn enable(&self) {
            self.enabled.set(true);
        }
    }

    #[test]
    fn test_guard_restores_mask() {
        let mask = FlagMask::new();
        {
            let _g = IrqGuard::new(&mask);
            assert!(!mask.enabled.get());
            {
                let _inner = IrqGuard::new(&mask);
                assert!(!mask.enabled.get());
            }
            // Inner guard saw interrupts already masked, so it must not
            // re-enable them.
            assert!(!mask.enabled.get());
        }
        assert!(mask.enabled.get());
    }

    #[test]
    fn test_irqcell_masks_during_access() {
        let cell = IrqCell::new(FlagMask::new(), 41u32);
        let masked_inside = cell.with(|v| {
            *v += 1;
            !cell.mask.enabled.get()
        });
        assert!(masked_inside);
        assert_eq!(cell.with(|v| *v), 42);
    }
}
