use core::fmt::{self, Debug, Formatter};
use core::marker::PhantomData;

use super::RwLock;
use crate::error::{LockError, LockMode};
use crate::relax::Relax;
use crate::timeout::Timeout;

/// Guards are bound to the thread that acquired them, so they must not be
/// sent to another thread.
type NotSend = PhantomData<*const ()>;

/// Releases a lock mode on guard drop, logging instead of panicking if the
/// release fails (the lock was disposed while the guard was alive).
fn release(mode: LockMode, result: Result<(), LockError>) {
    if let Err(error) = result {
        tracing::warn!(%mode, %error, "failed to release the lock on guard drop");
    }
}

impl<R: Relax> RwLock<R> {
    /// Acquires the lock in read mode and returns an RAII guard that releases
    /// it when dropped.
    ///
    /// # Errors
    ///
    /// Fails as [`enter_read_lock`].
    ///
    /// # Examples
    ///
    /// ```
    /// use slimlock::RwLock;
    ///
    /// let lock = RwLock::new();
    /// {
    ///     let _guard = lock.read()?;
    ///     assert!(lock.is_read_lock_held());
    /// }
    /// assert!(!lock.is_read_lock_held());
    /// # Ok::<(), slimlock::LockError>(())
    /// ```
    /// [`enter_read_lock`]: RwLock::enter_read_lock
    pub fn read(&self) -> Result<ReadGuard<'_, R>, LockError> {
        self.enter_read_lock()?;
        Ok(ReadGuard::new(self))
    }

    /// Attempts to acquire the lock in read mode for at most `timeout`,
    /// returning a guard if it was acquired.
    ///
    /// # Errors
    ///
    /// Fails as [`try_enter_read_lock`].
    ///
    /// [`try_enter_read_lock`]: RwLock::try_enter_read_lock
    pub fn try_read<T>(&self, timeout: T) -> Result<Option<ReadGuard<'_, R>>, LockError>
    where
        T: TryInto<Timeout>,
        LockError: From<T::Error>,
    {
        let acquired = self.try_enter_read_lock(timeout)?;
        Ok(acquired.then(|| ReadGuard::new(self)))
    }

    /// Acquires the lock in write mode and returns an RAII guard that releases
    /// it when dropped.
    ///
    /// To upgrade an upgradeable read lock, use
    /// [`UpgradeableReadGuard::upgrade`] instead.
    ///
    /// # Errors
    ///
    /// Fails as [`enter_write_lock`].
    ///
    /// [`enter_write_lock`]: RwLock::enter_write_lock
    pub fn write(&self) -> Result<WriteGuard<'_, R>, LockError> {
        self.enter_write_lock()?;
        Ok(WriteGuard::new(self))
    }

    /// Attempts to acquire the lock in write mode for at most `timeout`,
    /// returning a guard if it was acquired.
    ///
    /// # Errors
    ///
    /// Fails as [`try_enter_write_lock`].
    ///
    /// [`try_enter_write_lock`]: RwLock::try_enter_write_lock
    pub fn try_write<T>(&self, timeout: T) -> Result<Option<WriteGuard<'_, R>>, LockError>
    where
        T: TryInto<Timeout>,
        LockError: From<T::Error>,
    {
        let acquired = self.try_enter_write_lock(timeout)?;
        Ok(acquired.then(|| WriteGuard::new(self)))
    }

    /// Acquires the lock in upgradeable read mode and returns an RAII guard
    /// that releases it when dropped.
    ///
    /// # Errors
    ///
    /// Fails as [`enter_upgradeable_read_lock`].
    ///
    /// # Examples
    ///
    /// ```
    /// use slimlock::RwLock;
    ///
    /// let lock = RwLock::new();
    /// let mut guard = lock.upgradeable_read()?;
    /// {
    ///     let _write = guard.upgrade()?;
    ///     assert!(lock.is_write_lock_held());
    /// }
    /// assert!(!lock.is_write_lock_held());
    /// assert!(lock.is_upgradeable_read_lock_held());
    /// # Ok::<(), slimlock::LockError>(())
    /// ```
    /// [`enter_upgradeable_read_lock`]: RwLock::enter_upgradeable_read_lock
    pub fn upgradeable_read(&self) -> Result<UpgradeableReadGuard<'_, R>, LockError> {
        self.enter_upgradeable_read_lock()?;
        Ok(UpgradeableReadGuard::new(self))
    }

    /// Attempts to acquire the lock in upgradeable read mode for at most
    /// `timeout`, returning a guard if it was acquired.
    ///
    /// # Errors
    ///
    /// Fails as [`try_enter_upgradeable_read_lock`].
    ///
    /// [`try_enter_upgradeable_read_lock`]: RwLock::try_enter_upgradeable_read_lock
    pub fn try_upgradeable_read<T>(
        &self,
        timeout: T,
    ) -> Result<Option<UpgradeableReadGuard<'_, R>>, LockError>
    where
        T: TryInto<Timeout>,
        LockError: From<T::Error>,
    {
        let acquired = self.try_enter_upgradeable_read_lock(timeout)?;
        Ok(acquired.then(|| UpgradeableReadGuard::new(self)))
    }
}

/// An RAII implementation of a scoped read lock. When this structure is
/// dropped (falls out of scope), the read lock is released.
///
/// This structure is returned by the [`read`] and [`try_read`] methods on
/// [`RwLock`].
///
/// [`read`]: RwLock::read
/// [`try_read`]: RwLock::try_read
#[must_use = "if unused the RwLock will immediately unlock"]
pub struct ReadGuard<'a, R: Relax> {
    lock: &'a RwLock<R>,
    marker: NotSend,
}

impl<'a, R: Relax> ReadGuard<'a, R> {
    const fn new(lock: &'a RwLock<R>) -> Self {
        Self { lock, marker: PhantomData }
    }
}

impl<R: Relax> Drop for ReadGuard<'_, R> {
    #[inline]
    fn drop(&mut self) {
        release(LockMode::Read, self.lock.exit_read_lock());
    }
}

impl<R: Relax> Debug for ReadGuard<'_, R> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadGuard").field("lock", self.lock).finish()
    }
}

/// An RAII implementation of a scoped write lock. When this structure is
/// dropped (falls out of scope), the write lock is released.
///
/// This structure is returned by the [`write`] and [`try_write`] methods on
/// [`RwLock`], and by [`UpgradeableReadGuard::upgrade`]. In the latter case,
/// dropping it returns the thread to upgradeable read mode.
///
/// [`write`]: RwLock::write
/// [`try_write`]: RwLock::try_write
#[must_use = "if unused the RwLock will immediately unlock"]
pub struct WriteGuard<'a, R: Relax> {
    lock: &'a RwLock<R>,
    marker: NotSend,
}

impl<'a, R: Relax> WriteGuard<'a, R> {
    const fn new(lock: &'a RwLock<R>) -> Self {
        Self { lock, marker: PhantomData }
    }
}

impl<R: Relax> Drop for WriteGuard<'_, R> {
    #[inline]
    fn drop(&mut self) {
        release(LockMode::Write, self.lock.exit_write_lock());
    }
}

impl<R: Relax> Debug for WriteGuard<'_, R> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteGuard").field("lock", self.lock).finish()
    }
}

/// An RAII implementation of a scoped upgradeable read lock. When this
/// structure is dropped (falls out of scope), the upgradeable read lock is
/// released.
///
/// This structure is returned by the [`upgradeable_read`] and
/// [`try_upgradeable_read`] methods on [`RwLock`].
///
/// [`upgradeable_read`]: RwLock::upgradeable_read
/// [`try_upgradeable_read`]: RwLock::try_upgradeable_read
#[must_use = "if unused the RwLock will immediately unlock"]
pub struct UpgradeableReadGuard<'a, R: Relax> {
    lock: &'a RwLock<R>,
    marker: NotSend,
}

impl<'a, R: Relax> UpgradeableReadGuard<'a, R> {
    const fn new(lock: &'a RwLock<R>) -> Self {
        Self { lock, marker: PhantomData }
    }

    /// Upgrades to the write lock in place, blocking until every other reader
    /// has left.
    ///
    /// The returned guard borrows this one, which therefore cannot be dropped
    /// while the write lock is held.
    ///
    /// # Errors
    ///
    /// Fails as [`enter_write_lock`].
    ///
    /// [`enter_write_lock`]: RwLock::enter_write_lock
    pub fn upgrade(&mut self) -> Result<WriteGuard<'_, R>, LockError> {
        self.lock.enter_write_lock()?;
        Ok(WriteGuard::new(self.lock))
    }

    /// Attempts to upgrade to the write lock in place, waiting for at most
    /// `timeout` for the other readers to leave.
    ///
    /// # Errors
    ///
    /// Fails as [`try_enter_write_lock`].
    ///
    /// [`try_enter_write_lock`]: RwLock::try_enter_write_lock
    pub fn try_upgrade<T>(&mut self, timeout: T) -> Result<Option<WriteGuard<'_, R>>, LockError>
    where
        T: TryInto<Timeout>,
        LockError: From<T::Error>,
    {
        let acquired = self.lock.try_enter_write_lock(timeout)?;
        Ok(acquired.then(|| WriteGuard::new(self.lock)))
    }
}

impl<R: Relax> Drop for UpgradeableReadGuard<'_, R> {
    #[inline]
    fn drop(&mut self) {
        release(LockMode::UpgradeableRead, self.lock.exit_upgradeable_read_lock());
    }
}

impl<R: Relax> Debug for UpgradeableReadGuard<'_, R> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpgradeableReadGuard").field("lock", self.lock).finish()
    }
}

#[cfg(all(not(loom), test))]
mod test {
    use crate::relax::YieldBackoff;
    use crate::test::tests;

    #[test]
    fn read_guard_releases() {
        tests::read_guard_releases::<YieldBackoff>();
    }

    #[test]
    fn write_guard_releases() {
        tests::write_guard_releases::<YieldBackoff>();
    }

    #[test]
    fn upgrade_guard_returns_to_upgradeable() {
        tests::upgrade_guard_returns_to_upgradeable::<YieldBackoff>();
    }

    #[test]
    fn try_guards_respect_contention() {
        tests::try_guards_respect_contention::<YieldBackoff>();
    }

    #[test]
    fn guard_drop_after_dispose() {
        tests::guard_drop_after_dispose::<YieldBackoff>();
    }
}
