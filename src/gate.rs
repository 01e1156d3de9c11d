use core::marker::PhantomData;
use core::sync::atomic::Ordering::{Acquire, Relaxed, Release};

use crate::cfg::atomic::AtomicBool;
use crate::cfg::cell::{UnsafeCell, UnsafeCellWith};
use crate::relax::Relax;

/// A single word exclusive gate that protects a small, in-memory value.
///
/// The gate is acquired through compare-and-swap and waiting threads relax
/// according to `R` between attempts. It is meant to be held only for the few
/// instructions it takes to inspect or update the protected value, and it is
/// never held across a blocking wait: the protected value is only reachable
/// from within the closure given to [`lock_with`].
///
/// [`lock_with`]: SpinGate::lock_with
pub(crate) struct SpinGate<T, R> {
    locked: AtomicBool,
    relax: PhantomData<R>,
    data: UnsafeCell<T>,
}

// Same unsafe impls as `std::sync::Mutex`.
unsafe impl<T: Send, R> Send for SpinGate<T, R> {}
unsafe impl<T: Send, R> Sync for SpinGate<T, R> {}

impl<T, R> SpinGate<T, R> {
    /// Creates a new, open gate protecting `value`.
    pub(crate) fn new(value: T) -> Self {
        let locked = AtomicBool::new(false);
        let data = UnsafeCell::new(value);
        Self { locked, data, relax: PhantomData }
    }
}

impl<T, R: Relax> SpinGate<T, R> {
    /// Acquires the gate, runs `f` against the protected value and releases
    /// the gate once `f` returns or unwinds.
    pub(crate) fn lock_with<F, Ret>(&self, f: F) -> Ret
    where
        F: FnOnce(&mut T) -> Ret,
    {
        let _guard = self.acquire();
        // SAFETY: The gate is held until `_guard` drops, so no other thread
        // can reach the protected value.
        unsafe { self.data.with_mut_unchecked(f) }
    }

    fn acquire(&self) -> GateGuard<'_> {
        let mut relax = R::new();
        loop {
            if !self.locked.load(Relaxed)
                && self.locked.compare_exchange_weak(false, true, Acquire, Relaxed).is_ok()
            {
                return GateGuard { locked: &self.locked };
            }
            relax.relax();
        }
    }
}

/// Releases the gate on drop.
struct GateGuard<'a> {
    locked: &'a AtomicBool,
}

impl Drop for GateGuard<'_> {
    #[inline]
    fn drop(&mut self) {
        debug_assert!(self.locked.load(Relaxed), "released a spin gate that was not held");
        self.locked.store(false, Release);
    }
}

#[cfg(all(not(loom), test))]
mod test {
    use std::sync::Arc;
    use std::thread;

    use super::SpinGate;
    use crate::relax::{SpinBackoff, YieldBackoff};

    #[test]
    fn lock_with_returns_closure_value() {
        let gate = SpinGate::<_, YieldBackoff>::new(41);
        let value = gate.lock_with(|n| {
            *n += 1;
            *n
        });
        assert_eq!(value, 42);
    }

    #[test]
    fn serializes_updates() {
        const THREADS: u32 = 4;
        const ITERS: u32 = 1000;
        let gate = Arc::new(SpinGate::<u32, SpinBackoff>::new(0));
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let gate = Arc::clone(&gate);
                thread::spawn(move || {
                    for _ in 0..ITERS {
                        gate.lock_with(|n| *n += 1);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(gate.lock_with(|n| *n), THREADS * ITERS);
    }

    #[test]
    fn released_on_unwind() {
        let gate = Arc::new(SpinGate::<u32, YieldBackoff>::new(0));
        let c_gate = Arc::clone(&gate);
        let result = thread::spawn(move || c_gate.lock_with(|_| panic!())).join();
        assert!(result.is_err());
        assert_eq!(gate.lock_with(|n| *n), 0);
    }
}
