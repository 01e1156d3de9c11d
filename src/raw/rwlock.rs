use core::fmt::{self, Debug, Formatter};

use crate::cfg::sync::Arc;
use crate::context::ContextId;
use crate::error::{LockError, LockMode};
use crate::event::{Deadline, Event, Reset};
use crate::gate::SpinGate;
use crate::policy::RecursionPolicy;
use crate::relax::Relax;
use crate::table::RecursionTable;
use crate::timeout::Timeout;

/// The wait queue a blocked thread registers on.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Queue {
    /// Readers and upgradeable readers, woken all at once.
    Read,
    /// Writers, woken one at a time.
    Write,
    /// The single upgradeable reader converting to a writer.
    Upgrade,
}

/// Everything the spin gate protects.
///
/// `owners` is `0` when the lock is free, `N > 0` for `N` readers (the
/// upgradeable reader included) and `-1` while a writer holds the lock.
#[derive(Debug)]
struct LockState {
    owners: i32,
    writer: Option<ContextId>,
    upgradeable: Option<ContextId>,
    /// `None` once the lock has been disposed.
    table: Option<RecursionTable>,
    read_waiters: u32,
    write_waiters: u32,
    upgrade_waiters: u32,
    read_event: Option<Arc<Event>>,
    write_event: Option<Arc<Event>>,
    upgrade_event: Option<Arc<Event>>,
}

impl LockState {
    fn new() -> Self {
        Self {
            owners: 0,
            writer: None,
            upgradeable: None,
            table: Some(RecursionTable::new()),
            read_waiters: 0,
            write_waiters: 0,
            upgrade_waiters: 0,
            read_event: None,
            write_event: None,
            upgrade_event: None,
        }
    }

    fn table_mut(&mut self) -> Result<&mut RecursionTable, LockError> {
        self.table.as_mut().ok_or(LockError::Disposed)
    }

    fn ensure_live(&self) -> Result<(), LockError> {
        match self.table {
            Some(_) => Ok(()),
            None => Err(LockError::Disposed),
        }
    }

    fn reads(&self, context: ContextId) -> u32 {
        self.table.as_ref().map_or(0, |table| table.reads(context))
    }

    fn holds_write(&self, context: ContextId) -> bool {
        self.owners == -1 && self.writer == Some(context)
    }

    /// Registers one more waiter on `queue` and returns the event it must
    /// block on, creating the event on first use, along with its ticket.
    fn register(&mut self, queue: Queue) -> Result<(Arc<Event>, u64), LockError> {
        let (waiters, event, reset) = match queue {
            Queue::Read => (&mut self.read_waiters, &mut self.read_event, Reset::Manual),
            Queue::Write => (&mut self.write_waiters, &mut self.write_event, Reset::Auto),
            Queue::Upgrade => {
                if self.upgrade_waiters > 0 {
                    return Err(LockError::ConflictingUpgrade);
                }
                (&mut self.upgrade_waiters, &mut self.upgrade_event, Reset::Auto)
            }
        };
        let event = Arc::clone(event.get_or_insert_with(|| Arc::new(Event::new(reset))));
        let ticket = event.ticket();
        *waiters += 1;
        Ok((event, ticket))
    }

    fn unregister(&mut self, queue: Queue) {
        let waiters = match queue {
            Queue::Read => &mut self.read_waiters,
            Queue::Write => &mut self.write_waiters,
            Queue::Upgrade => &mut self.upgrade_waiters,
        };
        debug_assert!(*waiters > 0, "unregistered from an empty {queue:?} queue");
        *waiters -= 1;
    }

    /// Picks the class of waiters to wake after the lock state changed.
    ///
    /// A pending upgrade goes first, as soon as the upgrader is the only owner
    /// left. Then writers, once the lock is free. Readers last, and only while
    /// no writer holds the lock.
    fn select_wake(&self) -> Option<Arc<Event>> {
        if self.owners == 1 && self.upgrade_waiters != 0 {
            self.upgrade_event.clone()
        } else if self.owners == 0 && self.write_waiters > 0 {
            self.write_event.clone()
        } else if self.owners >= 0 && self.read_waiters != 0 {
            self.read_event.clone()
        } else {
            None
        }
    }
}

/// Signals the event picked by [`LockState::select_wake`], if any.
///
/// Must be called after the gate is released.
fn wake(event: Option<Arc<Event>>) {
    if let Some(event) = event {
        event.set();
    }
}

/// The outcome of one pass through the acquisition loop.
enum Step {
    Acquired,
    Park(Queue, Arc<Event>, u64),
    Abandon(Option<Arc<Event>>),
    Fail(LockError),
    Disposed(Arc<Event>, LockError),
}

/// A reader-writer lock with an upgradeable read mode.
///
/// The lock can be held in one of three modes:
///
/// - **read**: any number of threads at once;
/// - **upgradeable read**: a single thread at a time, concurrently with plain
///   readers, which may later convert its read slot into the write lock
///   without releasing it;
/// - **write**: a single thread, to the exclusion of every other mode.
///
/// The lock is not recursive. A thread that requests a mode it already holds,
/// or a mode that would deadlock against one it already holds, gets a
/// [`LockError::Recursion`] error. Plain readers cannot escalate to write mode,
/// threads that may need to write after reading should take the upgradeable
/// read lock instead.
///
/// A writer waiting for the lock stops new readers from being admitted, so a
/// continuous stream of readers cannot starve it. Each acquisition first
/// checks the lock state under a short lived spin gate, relaxing according to
/// `R` while the gate is contended, and only blocks the thread when the
/// requested mode is unavailable.
///
/// Locks are bound to the threads that acquire them: every `exit_*` call must
/// be made by the thread that made the matching `enter_*` call. The guard
/// returning methods ([`read`], [`write`] and [`upgradeable_read`]) pair the
/// calls automatically.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::thread;
///
/// use slimlock::RwLock;
///
/// let lock = Arc::new(RwLock::new());
///
/// lock.enter_upgradeable_read_lock()?;
/// let c_lock = Arc::clone(&lock);
/// let reader = thread::spawn(move || {
///     // Plain readers are admitted alongside the upgradeable reader.
///     c_lock.enter_read_lock()?;
///     c_lock.exit_read_lock()
/// });
/// reader.join().unwrap()?;
///
/// // Upgrades in place, without giving up the read slot.
/// lock.enter_write_lock()?;
/// assert!(lock.is_write_lock_held());
/// lock.exit_write_lock()?;
///
/// assert!(lock.is_upgradeable_read_lock_held());
/// lock.exit_upgradeable_read_lock()?;
/// # Ok::<(), slimlock::LockError>(())
/// ```
/// [`read`]: RwLock::read
/// [`write`]: RwLock::write
/// [`upgradeable_read`]: RwLock::upgradeable_read
pub struct RwLock<R> {
    gate: SpinGate<LockState, R>,
    policy: RecursionPolicy,
}

impl<R> RwLock<R> {
    /// Creates a new, free lock that rejects recursive acquisitions.
    ///
    /// # Examples
    ///
    /// ```
    /// use slimlock::raw;
    /// use slimlock::relax::Spin;
    ///
    /// let lock = raw::RwLock::<Spin>::new();
    /// assert_eq!(lock.current_read_count(), 0);
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self { gate: SpinGate::new(LockState::new()), policy: RecursionPolicy::NoRecursion }
    }

    /// Creates a new, free lock with the given recursion policy.
    ///
    /// # Errors
    ///
    /// Only [`RecursionPolicy::NoRecursion`] is implemented, any other policy
    /// fails with [`LockError::UnsupportedPolicy`].
    ///
    /// # Examples
    ///
    /// ```
    /// use slimlock::{LockError, RecursionPolicy, RwLock};
    ///
    /// assert!(RwLock::with_policy(RecursionPolicy::NoRecursion).is_ok());
    /// assert_eq!(
    ///     RwLock::with_policy(RecursionPolicy::SupportsRecursion).err(),
    ///     Some(LockError::UnsupportedPolicy(RecursionPolicy::SupportsRecursion)),
    /// );
    /// ```
    pub fn with_policy(policy: RecursionPolicy) -> Result<Self, LockError> {
        match policy {
            RecursionPolicy::NoRecursion => Ok(Self::new()),
            RecursionPolicy::SupportsRecursion => {
                tracing::debug!(?policy, "rejecting recursion policy");
                Err(LockError::UnsupportedPolicy(policy))
            }
        }
    }

    /// Returns the recursion policy of this lock.
    pub fn recursion_policy(&self) -> RecursionPolicy {
        self.policy
    }
}

impl<R: Relax> RwLock<R> {
    /// Acquires the lock in read mode, blocking the current thread until it
    /// is able to do so.
    ///
    /// # Errors
    ///
    /// Fails with [`LockError::Recursion`] if the current thread already holds
    /// the read or the write lock, and with [`LockError::Disposed`] after
    /// [`dispose`].
    ///
    /// [`dispose`]: RwLock::dispose
    pub fn enter_read_lock(&self) -> Result<(), LockError> {
        self.try_enter_read_lock(Timeout::Infinite).map(|_| ())
    }

    /// Attempts to acquire the lock in read mode, blocking for at most
    /// `timeout`.
    ///
    /// The timeout is either a [`Timeout`], a [`Duration`], or a number of
    /// milliseconds where `-1` waits forever and `0` never blocks. Returns
    /// whether the lock was acquired.
    ///
    /// Readers are not admitted while a writer is waiting, even if the lock is
    /// currently held by other readers only. The current upgradeable reader is
    /// the exception, since waiting writers are waiting on its read slot too.
    ///
    /// # Errors
    ///
    /// Fails with [`LockError::InvalidTimeout`] for malformed millisecond
    /// values, and otherwise as [`enter_read_lock`].
    ///
    /// # Examples
    ///
    /// ```
    /// use slimlock::RwLock;
    ///
    /// let lock = RwLock::new();
    /// lock.enter_write_lock()?;
    ///
    /// let reader = std::thread::scope(|s| s.spawn(|| lock.try_enter_read_lock(0)).join());
    /// assert_eq!(reader.unwrap(), Ok(false));
    /// # lock.exit_write_lock()?;
    /// # Ok::<(), slimlock::LockError>(())
    /// ```
    /// [`Duration`]: core::time::Duration
    /// [`enter_read_lock`]: RwLock::enter_read_lock
    pub fn try_enter_read_lock<T>(&self, timeout: T) -> Result<bool, LockError>
    where
        T: TryInto<Timeout>,
        LockError: From<T::Error>,
    {
        let timeout = timeout.try_into()?;
        let context = ContextId::current();
        self.enter(
            context,
            LockMode::Read,
            timeout,
            |state| {
                state.ensure_live()?;
                if state.holds_write(context) {
                    return Err(recursion(LockMode::Write, LockMode::Read));
                }
                let reads = state.table_mut()?.reads_mut(context);
                if *reads != 0 {
                    return Err(recursion(LockMode::Read, LockMode::Read));
                }
                *reads = 1;
                Ok(())
            },
            |state| {
                let upgrading = state.upgradeable == Some(context);
                if state.owners >= 0 && (state.write_waiters == 0 || upgrading) {
                    state.owners += 1;
                    None
                } else {
                    Some(Queue::Read)
                }
            },
            |state| {
                if let Some(table) = state.table.as_mut() {
                    *table.reads_mut(context) = 0;
                }
            },
        )
    }

    /// Releases a read lock held by the current thread.
    ///
    /// # Errors
    ///
    /// Fails with [`LockError::UnbalancedExit`] if the current thread does not
    /// hold a read lock, and with [`LockError::Disposed`] after [`dispose`].
    ///
    /// [`dispose`]: RwLock::dispose
    pub fn exit_read_lock(&self) -> Result<(), LockError> {
        let context = ContextId::current();
        self.exit(|state| {
            let table = state.table.as_mut().ok_or(LockError::Disposed)?;
            if state.owners < 1 || table.reads(context) == 0 {
                return Err(LockError::UnbalancedExit(LockMode::Read));
            }
            *table.reads_mut(context) -= 1;
            state.owners -= 1;
            Ok(())
        })
    }

    /// Acquires the lock in write mode, blocking the current thread until it
    /// is able to do so.
    ///
    /// If the current thread holds the upgradeable read lock, this upgrades
    /// it in place once every other reader has left, without giving up the
    /// read slot. Releasing the write lock then returns the thread to
    /// upgradeable read mode.
    ///
    /// # Errors
    ///
    /// Fails with [`LockError::Recursion`] if the current thread already holds
    /// the write lock or a plain read lock, with [`LockError::ConflictingUpgrade`]
    /// if another upgrade is already pending, and with [`LockError::Disposed`]
    /// after [`dispose`].
    ///
    /// [`dispose`]: RwLock::dispose
    pub fn enter_write_lock(&self) -> Result<(), LockError> {
        self.try_enter_write_lock(Timeout::Infinite).map(|_| ())
    }

    /// Attempts to acquire the lock in write mode, blocking for at most
    /// `timeout`.
    ///
    /// See [`try_enter_read_lock`] for the accepted timeout values and
    /// [`enter_write_lock`] for the upgrade behavior. Returns whether the lock
    /// was acquired.
    ///
    /// # Errors
    ///
    /// Fails with [`LockError::InvalidTimeout`] for malformed millisecond
    /// values, and otherwise as [`enter_write_lock`].
    ///
    /// [`try_enter_read_lock`]: RwLock::try_enter_read_lock
    /// [`enter_write_lock`]: RwLock::enter_write_lock
    pub fn try_enter_write_lock<T>(&self, timeout: T) -> Result<bool, LockError>
    where
        T: TryInto<Timeout>,
        LockError: From<T::Error>,
    {
        let timeout = timeout.try_into()?;
        let context = ContextId::current();
        self.enter(
            context,
            LockMode::Write,
            timeout,
            |state| {
                state.ensure_live()?;
                if state.holds_write(context) {
                    return Err(recursion(LockMode::Write, LockMode::Write));
                }
                if state.reads(context) > 0 {
                    return Err(recursion(LockMode::Read, LockMode::Write));
                }
                Ok(())
            },
            |state| {
                let upgrading = state.upgradeable == Some(context);
                if state.owners == 0 || (state.owners == 1 && upgrading) {
                    state.owners = -1;
                    state.writer = Some(context);
                    None
                } else if upgrading {
                    Some(Queue::Upgrade)
                } else {
                    Some(Queue::Write)
                }
            },
            |_| {},
        )
    }

    /// Releases the write lock held by the current thread.
    ///
    /// If the write lock was obtained by upgrading the upgradeable read lock,
    /// the thread keeps holding the upgradeable read lock.
    ///
    /// # Errors
    ///
    /// Fails with [`LockError::UnbalancedExit`] if the current thread does not
    /// hold the write lock, and with [`LockError::Disposed`] after [`dispose`].
    ///
    /// [`dispose`]: RwLock::dispose
    pub fn exit_write_lock(&self) -> Result<(), LockError> {
        let context = ContextId::current();
        self.exit(|state| {
            state.ensure_live()?;
            if !state.holds_write(context) {
                return Err(LockError::UnbalancedExit(LockMode::Write));
            }
            state.owners = if state.upgradeable == Some(context) { 1 } else { 0 };
            state.writer = None;
            Ok(())
        })
    }

    /// Acquires the lock in upgradeable read mode, blocking the current thread
    /// until it is able to do so.
    ///
    /// Only one thread at a time may hold the upgradeable read lock. It is
    /// granted only when the lock is free and no writer is waiting.
    ///
    /// # Errors
    ///
    /// Fails with [`LockError::Recursion`] if the current thread already holds
    /// any mode of this lock, and with [`LockError::Disposed`] after
    /// [`dispose`].
    ///
    /// [`dispose`]: RwLock::dispose
    pub fn enter_upgradeable_read_lock(&self) -> Result<(), LockError> {
        self.try_enter_upgradeable_read_lock(Timeout::Infinite).map(|_| ())
    }

    /// Attempts to acquire the lock in upgradeable read mode, blocking for at
    /// most `timeout`.
    ///
    /// See [`try_enter_read_lock`] for the accepted timeout values. Returns
    /// whether the lock was acquired.
    ///
    /// # Errors
    ///
    /// Fails with [`LockError::InvalidTimeout`] for malformed millisecond
    /// values, and otherwise as [`enter_upgradeable_read_lock`].
    ///
    /// [`try_enter_read_lock`]: RwLock::try_enter_read_lock
    /// [`enter_upgradeable_read_lock`]: RwLock::enter_upgradeable_read_lock
    pub fn try_enter_upgradeable_read_lock<T>(&self, timeout: T) -> Result<bool, LockError>
    where
        T: TryInto<Timeout>,
        LockError: From<T::Error>,
    {
        let timeout = timeout.try_into()?;
        let context = ContextId::current();
        self.enter(
            context,
            LockMode::UpgradeableRead,
            timeout,
            |state| {
                state.ensure_live()?;
                if state.upgradeable == Some(context) {
                    return Err(recursion(LockMode::UpgradeableRead, LockMode::UpgradeableRead));
                }
                if state.holds_write(context) {
                    return Err(recursion(LockMode::Write, LockMode::UpgradeableRead));
                }
                if state.reads(context) > 0 {
                    return Err(recursion(LockMode::Read, LockMode::UpgradeableRead));
                }
                Ok(())
            },
            |state| {
                if state.owners == 0 && state.write_waiters == 0 && state.upgradeable.is_none() {
                    state.owners = 1;
                    state.upgradeable = Some(context);
                    None
                } else {
                    Some(Queue::Read)
                }
            },
            |_| {},
        )
    }

    /// Releases the upgradeable read lock held by the current thread.
    ///
    /// # Errors
    ///
    /// Fails with [`LockError::UnbalancedExit`] if the current thread does not
    /// hold the upgradeable read lock, with [`LockError::UpgradeStillHeld`] if
    /// it still holds the write lock it upgraded to, and with
    /// [`LockError::Disposed`] after [`dispose`].
    ///
    /// [`dispose`]: RwLock::dispose
    pub fn exit_upgradeable_read_lock(&self) -> Result<(), LockError> {
        let context = ContextId::current();
        self.exit(|state| {
            state.ensure_live()?;
            if state.upgradeable != Some(context) {
                return Err(LockError::UnbalancedExit(LockMode::UpgradeableRead));
            }
            if state.holds_write(context) {
                return Err(LockError::UpgradeStillHeld);
            }
            debug_assert!(state.owners >= 1, "upgradeable reader without a read slot");
            state.owners -= 1;
            state.upgradeable = None;
            Ok(())
        })
    }

    /// Disposes of the lock.
    ///
    /// Every later `enter_*` and `exit_*` call fails with
    /// [`LockError::Disposed`], and so do the calls of threads blocked on the
    /// lock at the time, which are woken up. Queries keep working and report
    /// the lock as not held by the current thread.
    pub fn dispose(&self) {
        let events = self.gate.lock_with(|state| {
            state.table.take()?;
            Some([state.read_event.clone(), state.write_event.clone(), state.upgrade_event.clone()])
        });
        if let Some(events) = events {
            tracing::debug!("lock disposed");
            events.into_iter().for_each(wake);
        }
    }

    /// Returns `true` if the current thread holds a read lock.
    pub fn is_read_lock_held(&self) -> bool {
        self.recursive_read_count() > 0
    }

    /// Returns `true` if the current thread holds the write lock.
    pub fn is_write_lock_held(&self) -> bool {
        self.recursive_write_count() > 0
    }

    /// Returns `true` if the current thread holds the upgradeable read lock.
    pub fn is_upgradeable_read_lock_held(&self) -> bool {
        self.recursive_upgrade_count() > 0
    }

    /// Returns the number of threads holding the lock in read mode, the
    /// upgradeable reader included.
    pub fn current_read_count(&self) -> u32 {
        self.gate.lock_with(|state| u32::try_from(state.owners).unwrap_or(0))
    }

    /// Returns the number of read locks held by the current thread, which is
    /// at most one.
    pub fn recursive_read_count(&self) -> u32 {
        let context = ContextId::current();
        self.gate.lock_with(|state| state.reads(context))
    }

    /// Returns the number of write locks held by the current thread, which is
    /// at most one.
    pub fn recursive_write_count(&self) -> u32 {
        let context = ContextId::current();
        self.gate.lock_with(|state| u32::from(state.holds_write(context)))
    }

    /// Returns the number of upgradeable read locks held by the current
    /// thread, which is at most one.
    pub fn recursive_upgrade_count(&self) -> u32 {
        let context = ContextId::current();
        self.gate.lock_with(|state| u32::from(state.upgradeable == Some(context)))
    }

    /// Returns the number of threads waiting to enter read mode, including
    /// those waiting for upgradeable read mode.
    pub fn waiting_read_count(&self) -> u32 {
        self.gate.lock_with(|state| state.read_waiters)
    }

    /// Returns the number of threads waiting to enter write mode.
    pub fn waiting_write_count(&self) -> u32 {
        self.gate.lock_with(|state| state.write_waiters)
    }

    /// Returns the number of threads waiting to upgrade to write mode.
    pub fn waiting_upgrade_count(&self) -> u32 {
        self.gate.lock_with(|state| state.upgrade_waiters)
    }

    /// Runs the acquisition loop shared by every mode.
    ///
    /// `check` runs once, under the gate, before anything else. `admit` takes
    /// the lock and returns `None`, or returns the queue to wait on. `cancel`
    /// undoes the effects of `check` when the attempt is abandoned.
    fn enter<C, A, X>(
        &self,
        context: ContextId,
        mode: LockMode,
        timeout: Timeout,
        check: C,
        mut admit: A,
        cancel: X,
    ) -> Result<bool, LockError>
    where
        C: FnOnce(&mut LockState) -> Result<(), LockError>,
        A: FnMut(&mut LockState) -> Option<Queue>,
        X: FnOnce(&mut LockState),
    {
        let deadline = Deadline::after(timeout);
        let mut check = Some(check);
        let mut cancel = Some(cancel);
        let mut woken: Option<(Queue, Arc<Event>, bool)> = None;
        loop {
            let step = self.gate.lock_with(|state| {
                if let Some(check) = check.take() {
                    if let Err(error) = check(state) {
                        return Step::Fail(error);
                    }
                }
                let registered = woken.is_some();
                if let Some((queue, event, signaled)) = woken.take() {
                    state.unregister(queue);
                    if let Err(error) = state.ensure_live() {
                        // Pass the dispose signal on to the next waiter.
                        return Step::Disposed(event, error);
                    }
                    if !signaled {
                        if let Some(cancel) = cancel.take() {
                            cancel(state);
                        }
                        return Step::Abandon(state.select_wake());
                    }
                }
                let Some(queue) = admit(state) else {
                    return Step::Acquired;
                };
                if deadline.has_expired() {
                    if let Some(cancel) = cancel.take() {
                        cancel(state);
                    }
                    return Step::Abandon(if registered { state.select_wake() } else { None });
                }
                match state.register(queue) {
                    Ok((event, ticket)) => Step::Park(queue, event, ticket),
                    Err(error) => {
                        tracing::error!(%context, %mode, %error, "refusing to queue a second upgrade");
                        if let Some(cancel) = cancel.take() {
                            cancel(state);
                        }
                        Step::Fail(error)
                    }
                }
            });
            match step {
                Step::Acquired => return Ok(true),
                Step::Fail(error) => return Err(error),
                Step::Disposed(event, error) => {
                    tracing::trace!(%context, %mode, "lock disposed while waiting");
                    event.set();
                    return Err(error);
                }
                Step::Abandon(event) => {
                    tracing::trace!(%context, %mode, "timed out waiting for the lock");
                    wake(event);
                    return Ok(false);
                }
                Step::Park(queue, event, ticket) => {
                    tracing::trace!(%context, %mode, ?queue, "waiting for the lock");
                    let signaled = event.wait(ticket, deadline);
                    woken = Some((queue, event, signaled));
                }
            }
        }
    }

    /// Runs a release under the gate, then wakes the waiters it selected once
    /// the gate is released.
    fn exit<F>(&self, release: F) -> Result<(), LockError>
    where
        F: FnOnce(&mut LockState) -> Result<(), LockError>,
    {
        let (event, owners) = self.gate.lock_with(|state| {
            release(state)?;
            Ok::<_, LockError>((state.select_wake(), state.owners))
        })?;
        if event.is_some() {
            tracing::trace!(owners, "waking waiters");
        }
        wake(event);
        Ok(())
    }
}

const fn recursion(held: LockMode, requested: LockMode) -> LockError {
    LockError::Recursion { held, requested }
}

impl<R> Default for RwLock<R> {
    /// Creates a new, free lock that rejects recursive acquisitions.
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Relax> Debug for RwLock<R> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let (owners, read_waiters, write_waiters, upgrade_waiters, disposed) =
            self.gate.lock_with(|state| {
                let disposed = state.table.is_none();
                (state.owners, state.read_waiters, state.write_waiters, state.upgrade_waiters, disposed)
            });
        f.debug_struct("RwLock")
            .field("owners", &owners)
            .field("read_waiters", &read_waiters)
            .field("write_waiters", &write_waiters)
            .field("upgrade_waiters", &upgrade_waiters)
            .field("policy", &self.policy)
            .field("disposed", &disposed)
            .finish()
    }
}

#[cfg(all(not(loom), test))]
mod test {
    use std::sync::Arc;

    use super::{LockState, Queue};
    use crate::error::LockError;
    use crate::event::Deadline;
    use crate::timeout::Timeout;
    use crate::relax::YieldBackoff;
    use crate::test::tests;

    #[test]
    fn select_wake_prefers_upgrade() {
        let mut state = LockState::new();
        state.owners = 1;
        state.register(Queue::Upgrade).unwrap();
        state.register(Queue::Write).unwrap();
        state.register(Queue::Read).unwrap();
        let selected = state.select_wake().unwrap();
        assert!(Arc::ptr_eq(&selected, state.upgrade_event.as_ref().unwrap()));
    }

    #[test]
    fn select_wake_prefers_writers_when_free() {
        let mut state = LockState::new();
        state.register(Queue::Write).unwrap();
        state.register(Queue::Read).unwrap();
        let selected = state.select_wake().unwrap();
        assert!(Arc::ptr_eq(&selected, state.write_event.as_ref().unwrap()));
        state.owners = 2;
        let selected = state.select_wake().unwrap();
        assert!(Arc::ptr_eq(&selected, state.read_event.as_ref().unwrap()));
        state.owners = -1;
        assert!(state.select_wake().is_none());
    }

    #[test]
    fn select_wake_without_waiters() {
        let state = LockState::new();
        assert!(state.select_wake().is_none());
    }

    #[test]
    fn second_upgrade_waiter_conflicts() {
        let mut state = LockState::new();
        state.register(Queue::Upgrade).unwrap();
        assert_eq!(state.register(Queue::Upgrade).err(), Some(LockError::ConflictingUpgrade));
        assert_eq!(state.upgrade_waiters, 1);
        state.unregister(Queue::Upgrade);
        assert!(state.register(Queue::Upgrade).is_ok());
    }

    #[test]
    fn events_are_created_once() {
        let mut state = LockState::new();
        assert!(state.read_event.is_none());
        let (first, _) = state.register(Queue::Read).unwrap();
        let (second, _) = state.register(Queue::Read).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(state.read_waiters, 2);
    }

    #[test]
    fn read_signal_survives_later_registration() {
        let mut state = LockState::new();
        let (event, ticket) = state.register(Queue::Read).unwrap();
        state.select_wake().unwrap().set();
        let (_, later) = state.register(Queue::Read).unwrap();
        assert!(event.wait(ticket, Deadline::after(Timeout::ZERO)));
        assert!(!event.wait(later, Deadline::after(Timeout::ZERO)));
    }

    #[test]
    fn concurrent_readers() {
        tests::concurrent_readers::<YieldBackoff>();
    }

    #[test]
    fn readers_block_writer() {
        tests::readers_block_writer::<YieldBackoff>();
    }

    #[test]
    fn single_upgradeable_reader() {
        tests::single_upgradeable_reader::<YieldBackoff>();
    }

    #[test]
    fn upgrade_in_place() {
        tests::upgrade_in_place::<YieldBackoff>();
    }

    #[test]
    fn upgrade_waits_for_readers() {
        tests::upgrade_waits_for_readers::<YieldBackoff>();
    }

    #[test]
    fn read_recursion_rejected() {
        tests::read_recursion_rejected::<YieldBackoff>();
    }

    #[test]
    fn mode_recursion_rejected() {
        tests::mode_recursion_rejected::<YieldBackoff>();
    }

    #[test]
    fn unbalanced_exits() {
        tests::unbalanced_exits::<YieldBackoff>();
    }

    #[test]
    fn exits_from_other_thread_are_unbalanced() {
        tests::exits_from_other_thread_are_unbalanced::<YieldBackoff>();
    }

    #[test]
    fn try_read_zero_does_not_block() {
        tests::try_read_zero_does_not_block::<YieldBackoff>();
    }

    #[test]
    fn timed_read_gives_up() {
        tests::timed_read_gives_up::<YieldBackoff>();
    }

    #[test]
    fn upgradeable_readers_exclude_each_other() {
        tests::upgradeable_readers_exclude_each_other::<YieldBackoff>();
    }

    #[test]
    fn waiting_writer_blocks_new_readers() {
        tests::waiting_writer_blocks_new_readers::<YieldBackoff>();
    }

    #[test]
    fn abandoned_writer_releases_readers() {
        tests::abandoned_writer_releases_readers::<YieldBackoff>();
    }

    #[test]
    fn lots_and_lots_write() {
        tests::lots_and_lots_write::<YieldBackoff>();
    }

    #[test]
    fn invalid_timeout() {
        tests::invalid_timeout::<YieldBackoff>();
    }

    #[test]
    fn disposed() {
        tests::disposed::<YieldBackoff>();
    }

    #[test]
    fn unsupported_policy() {
        tests::unsupported_policy::<YieldBackoff>();
    }

    #[test]
    fn downgrade() {
        tests::downgrade::<YieldBackoff>();
    }

    #[test]
    fn exit_upgradeable_while_upgraded() {
        tests::exit_upgradeable_while_upgraded::<YieldBackoff>();
    }

    #[test]
    fn remaining_time_is_kept_across_wakes() {
        tests::remaining_time_is_kept_across_wakes::<YieldBackoff>();
    }

    #[test]
    fn signaled_reader_is_admitted() {
        tests::signaled_reader_is_admitted::<YieldBackoff>();
    }

    #[test]
    fn waiter_fails_after_dispose() {
        tests::waiter_fails_after_dispose::<YieldBackoff>();
    }

    #[test]
    fn test_lock_debug() {
        tests::test_lock_debug::<YieldBackoff>();
    }
}

#[cfg(all(not(loom), test))]
mod test_spins {
    use crate::relax::SpinBackoff;
    use crate::test::tests;

    #[test]
    fn concurrent_readers() {
        tests::concurrent_readers::<SpinBackoff>();
    }

    #[test]
    fn upgrade_waits_for_readers() {
        tests::upgrade_waits_for_readers::<SpinBackoff>();
    }

    #[test]
    fn lots_and_lots_write() {
        tests::lots_and_lots_write::<SpinBackoff>();
    }
}

#[cfg(all(loom, test))]
mod model {
    use crate::loom::models;
    use crate::relax::Yield;

    #[test]
    fn write_join() {
        models::write_join::<Yield>();
    }

    #[test]
    fn read_write_join() {
        models::read_write_join::<Yield>();
    }

    #[test]
    fn upgrade_join() {
        models::upgrade_join::<Yield>();
    }
}
