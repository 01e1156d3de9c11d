//! Switches between the standard library primitives and Loom's simulated
//! primitives, so that the same code can run under the Loom model checker.

pub mod atomic {
    #[cfg(not(all(loom, test)))]
    pub use core::sync::atomic::AtomicBool;

    #[cfg(all(loom, test))]
    pub use loom::sync::atomic::AtomicBool;
}

pub mod cell {
    #[cfg(not(all(loom, test)))]
    pub use core::cell::UnsafeCell;

    #[cfg(all(loom, test))]
    pub use loom::cell::UnsafeCell;

    /// Gives closure-scoped, unchecked mutable access to the contents of an
    /// `UnsafeCell`, regardless of which implementation backs it.
    pub trait UnsafeCellWith<T: ?Sized> {
        /// Runs `f` against a mutable reference to the cell contents.
        ///
        /// # Safety
        ///
        /// Caller must guarantee that there are no other references to the
        /// cell contents for the duration of `f`.
        unsafe fn with_mut_unchecked<F, Ret>(&self, f: F) -> Ret
        where
            F: FnOnce(&mut T) -> Ret;
    }

    #[cfg(not(all(loom, test)))]
    impl<T: ?Sized> UnsafeCellWith<T> for UnsafeCell<T> {
        #[inline(always)]
        unsafe fn with_mut_unchecked<F, Ret>(&self, f: F) -> Ret
        where
            F: FnOnce(&mut T) -> Ret,
        {
            // SAFETY: Caller guaranteed exclusive access to the contents.
            f(unsafe { &mut *self.get() })
        }
    }

    #[cfg(all(loom, test))]
    #[cfg(not(tarpaulin_include))]
    impl<T: ?Sized> UnsafeCellWith<T> for UnsafeCell<T> {
        unsafe fn with_mut_unchecked<F, Ret>(&self, f: F) -> Ret
        where
            F: FnOnce(&mut T) -> Ret,
        {
            // SAFETY: Caller guaranteed exclusive access to the contents, Loom
            // still checks that claim.
            self.with_mut(|ptr| f(unsafe { &mut *ptr }))
        }
    }
}

pub mod hint {
    #[cfg(not(all(loom, test)))]
    pub use core::hint::spin_loop;

    #[cfg(all(loom, test))]
    pub use loom::hint::spin_loop;
}

pub mod sync {
    #[cfg(not(all(loom, test)))]
    pub use std::sync::{Arc, Condvar, Mutex};

    #[cfg(all(loom, test))]
    pub use loom::sync::{Arc, Condvar, Mutex};
}

pub mod thread {
    #[cfg(not(all(loom, test)))]
    pub use std::thread::yield_now;

    #[cfg(not(all(loom, test)))]
    pub use std::thread_local;

    #[cfg(all(loom, test))]
    pub use loom::thread::yield_now;

    #[cfg(all(loom, test))]
    pub use loom::thread_local;
}
