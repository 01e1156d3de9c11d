// Modified version of relax.rs from spin-rs to support Loom yielding,
// exponential backoff and processor count aware yielding.
//
// Original file at its most recent change (at the time of writing):
// https://github.com/mvdnes/spin-rs/blob/5860ee114094cf200b97348ff332155fbd7159b4/src/relax.rs
//
// Copyright (c) 2014 Mathijs van de Nes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Strategies that determine the behaviour of the spin gate when encountering
//! contention.
//!
//! The spin gate only ever protects a handful of counters, so it is held for
//! a few instructions at a time. Threads that lose the race for it relax
//! according to one of the strategies below before retrying.

use std::sync::OnceLock;

use crate::cfg::{hint, thread};

/// A trait implemented by spinning relax strategies.
///
/// # Example
///
/// ```
/// use slimlock::relax::Relax;
///
/// struct Spin;
///
/// impl Relax for Spin {
///     #[inline(always)]
///     fn new() -> Self {
///         Self
///     }
///
///     #[inline(always)]
///     fn relax(&mut self) {
///         core::hint::spin_loop();
///     }
/// }
/// ```
pub trait Relax {
    /// Returns the initial value for this relaxing strategy.
    fn new() -> Self;

    /// Performs the relaxing operation during a period of contention.
    fn relax(&mut self);
}

/// Returns `true` if the process runs on more than one processor.
///
/// Busy-waiting only pays off when the gate holder can make progress on
/// another processor at the same time. The processor count is queried once
/// per process and cached for all locks.
pub fn is_multiprocessor() -> bool {
    static MULTIPROCESSOR: OnceLock<bool> = OnceLock::new();
    *MULTIPROCESSOR.get_or_init(|| {
        let cpus = std::thread::available_parallelism().map_or(1, |n| n.get());
        tracing::debug!(cpus, "detected processor count");
        cpus > 1
    })
}

/// A strategy that rapidly spins while informing the CPU that it should power
/// down non-essential components via [`core::hint::spin_loop`].
///
/// Note that spinning is a 'dumb' strategy and most schedulers cannot correctly
/// differentiate it from useful work, thereby misallocating even more CPU time
/// to the spinning process. This is known as [priority inversion].
///
/// [priority inversion]: https://matklad.github.io/2020/01/02/spinlocks-considered-harmful.html
pub struct Spin;

impl Relax for Spin {
    #[inline(always)]
    fn new() -> Self {
        Self
    }

    #[inline(always)]
    fn relax(&mut self) {
        hint::spin_loop();
    }
}

/// A strategy that yields the current time slice to the scheduler in favour of
/// other threads or processes.
pub struct Yield;

impl Relax for Yield {
    #[inline(always)]
    fn new() -> Self {
        Self
    }

    #[inline(always)]
    fn relax(&mut self) {
        thread::yield_now();
    }
}

// Exponential backoff is based on the crossbeam-utils implementation.
// link to most recent change (as the time of writing):
// https://github.com/crossbeam-rs/crossbeam/blob/371de8c2d304db07662450995848f3dc9598ac99/crossbeam-utils/src/backoff.rs
//
// Copyright (c) 2019 The Crossbeam Project Developers
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

/// An unsigned integer type use as the inner type for [`Backoff`].
type Uint = u32;

/// A strategy that, as [`Spin`], will run a busy-wait spin-loop, except this
/// implementation will perform exponential backoff.
///
/// As with [`Spin`], this implementation is subject to priority inversion
/// problems, prefer [`YieldBackoff`] unless the gate is known to be held by
/// threads pinned to distinct processors.
pub struct SpinBackoff {
    inner: Backoff<{ Self::MAX }>,
}

impl SpinBackoff {
    /// The largest value the inner backoff counter can reach.
    const MAX: Uint = 6;
}

// The maximum inner value **must** be smaller than Uint::BITS, or else the
// bitshift operation will overflow, which is incorrect behavior.
const _: () = assert!(SpinBackoff::MAX < Uint::BITS);

impl Relax for SpinBackoff {
    #[inline(always)]
    fn new() -> Self {
        Self { inner: Backoff::default() }
    }

    #[inline(always)]
    fn relax(&mut self) {
        self.inner.spin();
        self.inner.step();
    }
}

/// A strategy that performs a few rounds of exponential backoff in a spin
/// loop and then yields back to the OS scheduler.
///
/// Spinning is skipped entirely on single processor machines, where the
/// thread holding the gate cannot run until this one gives up its time slice.
/// This is the strategy used by [`crate::RwLock`].
pub struct YieldBackoff {
    inner: Backoff<{ Self::MAX }>,
    spin: bool,
}

impl YieldBackoff {
    /// The largest value the inner backoff counter can reach.
    const MAX: Uint = 4;
}

const _: () = assert!(YieldBackoff::MAX < Uint::BITS);

impl Relax for YieldBackoff {
    #[inline(always)]
    fn new() -> Self {
        Self { inner: Backoff::default(), spin: is_multiprocessor() }
    }

    #[inline(always)]
    fn relax(&mut self) {
        if self.spin && self.inner.0 < Self::MAX {
            self.inner.spin();
            self.inner.step();
        } else {
            thread::yield_now();
        }
    }
}

/// Inner backoff counter that keeps track of the number of shifts applied.
///
/// The maximum value the inner shift counter can take is defined by `MAX`.
#[derive(Default)]
struct Backoff<const MAX: Uint>(Uint);

impl<const MAX: Uint> Backoff<MAX> {
    /// Runs a bounded spin loop `1 << self.0` times, up to `1 << MAX` times.
    fn spin(&self) {
        let shifts = self.0.min(MAX);
        for _ in 0..(1 << shifts) {
            hint::spin_loop();
        }
    }

    /// Incremets one to the inner counter, saturating the counter at `MAX`.
    fn step(&mut self) {
        (self.0 < MAX).then(|| self.0 += 1);
    }
}

#[cfg(all(not(loom), test))]
mod test {
    use super::{Relax, Uint};

    fn returns<R: Relax, const MAX: Uint>() {
        let mut relax = R::new();
        for _ in 0..=MAX.saturating_mul(10) {
            relax.relax();
        }
    }

    #[test]
    fn spins() {
        returns::<super::Spin, 10>();
    }

    #[test]
    fn spins_backoff() {
        use super::SpinBackoff;
        const MAX: Uint = SpinBackoff::MAX;
        returns::<SpinBackoff, MAX>();
    }

    #[test]
    fn yields() {
        returns::<super::Yield, 10>();
    }

    #[test]
    fn yields_backoff() {
        use super::YieldBackoff;
        const MAX: Uint = YieldBackoff::MAX;
        returns::<YieldBackoff, MAX>();
    }

    #[test]
    fn backoff_saturates() {
        let mut backoff = super::Backoff::<3>::default();
        for _ in 0..10 {
            backoff.step();
        }
        assert_eq!(backoff.0, 3);
    }

    #[test]
    fn processor_count_is_cached() {
        assert_eq!(super::is_multiprocessor(), super::is_multiprocessor());
    }
}
