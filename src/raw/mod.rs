//! Reader-writer lock implementation.
//!
//! The [`RwLock`] in this module is generic over the relax policy used while
//! the spin gate that protects its counters is contended. User may choose a
//! policy as long as it implements the [`Relax`] trait. Blocking on the lock
//! itself, as opposed to its gate, always parks the thread.
//!
//! There is a number of relax policies provided by the [`relax`] module. The
//! following modules provide type aliases for [`RwLock`] and its guards
//! associated with a relax policy. See their documentation for more
//! information.
//!
//! [`relax`]: crate::relax
//! [`Relax`]: crate::relax::Relax

mod guard;
mod rwlock;

pub use guard::{ReadGuard, UpgradeableReadGuard, WriteGuard};
pub use rwlock::RwLock;

/// A lock whose gate implements a `spin with backoff` relax policy.
///
/// While the gate is contended, threads perform exponential backoff while
/// spinning, signaling the processor that they are running a busy-wait
/// spin-loop. They never yield to the scheduler.
pub mod spins {
    use super::{guard, rwlock};
    use crate::relax::SpinBackoff;

    /// A [`raw::RwLock`] that implements the [`SpinBackoff`] relax policy.
    ///
    /// # Example
    ///
    /// ```
    /// use slimlock::raw::spins::RwLock;
    ///
    /// let lock = RwLock::new();
    /// let guard = lock.read()?;
    /// assert_eq!(lock.current_read_count(), 1);
    /// # drop(guard);
    /// # Ok::<(), slimlock::LockError>(())
    /// ```
    /// [`raw::RwLock`]: rwlock::RwLock
    pub type RwLock = rwlock::RwLock<SpinBackoff>;

    /// A [`raw::ReadGuard`] that implements the [`SpinBackoff`] relax policy.
    ///
    /// [`raw::ReadGuard`]: guard::ReadGuard
    pub type ReadGuard<'a> = guard::ReadGuard<'a, SpinBackoff>;

    /// A [`raw::WriteGuard`] that implements the [`SpinBackoff`] relax policy.
    ///
    /// [`raw::WriteGuard`]: guard::WriteGuard
    pub type WriteGuard<'a> = guard::WriteGuard<'a, SpinBackoff>;

    /// A [`raw::UpgradeableReadGuard`] that implements the [`SpinBackoff`]
    /// relax policy.
    ///
    /// [`raw::UpgradeableReadGuard`]: guard::UpgradeableReadGuard
    pub type UpgradeableReadGuard<'a> = guard::UpgradeableReadGuard<'a, SpinBackoff>;
}

/// A lock whose gate implements a `spin then yield` relax policy.
///
/// While the gate is contended, threads spin with exponential backoff for a
/// few rounds and then yield the current time slice to the OS scheduler. On
/// single processor machines they yield right away.
pub mod yields {
    use super::{guard, rwlock};
    use crate::relax::YieldBackoff;

    /// A [`raw::RwLock`] that implements the [`YieldBackoff`] relax policy.
    ///
    /// # Example
    ///
    /// ```
    /// use slimlock::raw::yields::RwLock;
    ///
    /// let lock = RwLock::new();
    /// let guard = lock.write()?;
    /// assert!(lock.is_write_lock_held());
    /// # drop(guard);
    /// # Ok::<(), slimlock::LockError>(())
    /// ```
    /// [`raw::RwLock`]: rwlock::RwLock
    pub type RwLock = rwlock::RwLock<YieldBackoff>;

    /// A [`raw::ReadGuard`] that implements the [`YieldBackoff`] relax policy.
    ///
    /// [`raw::ReadGuard`]: guard::ReadGuard
    pub type ReadGuard<'a> = guard::ReadGuard<'a, YieldBackoff>;

    /// A [`raw::WriteGuard`] that implements the [`YieldBackoff`] relax policy.
    ///
    /// [`raw::WriteGuard`]: guard::WriteGuard
    pub type WriteGuard<'a> = guard::WriteGuard<'a, YieldBackoff>;

    /// A [`raw::UpgradeableReadGuard`] that implements the [`YieldBackoff`]
    /// relax policy.
    ///
    /// [`raw::UpgradeableReadGuard`]: guard::UpgradeableReadGuard
    pub type UpgradeableReadGuard<'a> = guard::UpgradeableReadGuard<'a, YieldBackoff>;
}
