use core::time::Duration;
use std::time::Instant;

/// How long a test waits for another thread to reach an observable state
/// before giving up.
const PATIENCE: Duration = Duration::from_secs(10);

/// Polls `condition` until it holds, panicking after [`PATIENCE`].
pub fn wait_until<F: FnMut() -> bool>(what: &str, mut condition: F) {
    let start = Instant::now();
    while !condition() {
        assert!(start.elapsed() < PATIENCE, "timed out waiting until {what}");
        std::thread::sleep(Duration::from_millis(1));
    }
}

pub fn trace_init() -> tracing::dispatcher::DefaultGuard {
    use tracing_subscriber::prelude::*;
    tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::TRACE)
        .with_target(false)
        .with_timer(())
        .set_default()
}

pub mod tests {
    use core::time::Duration;
    use std::sync::atomic::{AtomicU32, Ordering::Relaxed};
    use std::sync::mpsc::channel;
    use std::sync::{Arc, Barrier};
    use std::thread;
    use std::time::Instant;

    use super::{trace_init, wait_until};
    use crate::error::{LockError, LockMode};
    use crate::policy::RecursionPolicy;
    use crate::raw::RwLock;
    use crate::relax::Relax;
    use crate::timeout::Timeout;

    const ITERS: u32 = 1000;
    const CONCURRENCY: u32 = 3;
    const EXPECTED_VALUE: u32 = ITERS * CONCURRENCY * 2;

    /// A lock shared across threads.
    fn shared<R: Relax>() -> Arc<RwLock<R>> {
        Arc::new(RwLock::new())
    }

    fn recursion(held: LockMode, requested: LockMode) -> LockError {
        LockError::Recursion { held, requested }
    }

    pub fn concurrent_readers<R: Relax + 'static>() {
        const READERS: usize = 8;
        let _trace = trace_init();
        let lock = shared::<R>();
        let entered = Arc::new(Barrier::new(READERS + 1));
        let release = Arc::new(Barrier::new(READERS + 1));
        let handles: Vec<_> = (0..READERS)
            .map(|_| {
                let (lock, entered, release) =
                    (Arc::clone(&lock), Arc::clone(&entered), Arc::clone(&release));
                thread::spawn(move || {
                    lock.enter_read_lock().unwrap();
                    assert!(lock.is_read_lock_held());
                    entered.wait();
                    release.wait();
                    lock.exit_read_lock().unwrap();
                })
            })
            .collect();
        entered.wait();
        assert_eq!(lock.current_read_count(), READERS as u32);
        assert!(!lock.is_read_lock_held());
        release.wait();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(lock.current_read_count(), 0);
    }

    pub fn readers_block_writer<R: Relax + 'static>() {
        let _trace = trace_init();
        let lock = shared::<R>();
        lock.enter_read_lock().unwrap();

        let c_lock = Arc::clone(&lock);
        let probe = thread::spawn(move || c_lock.try_enter_write_lock(0)).join().unwrap();
        assert_eq!(probe, Ok(false));

        let (tx, rx) = channel();
        let c_lock = Arc::clone(&lock);
        let writer = thread::spawn(move || {
            c_lock.enter_write_lock().unwrap();
            tx.send(()).unwrap();
            c_lock.exit_write_lock().unwrap();
        });
        wait_until("the writer waits", || lock.waiting_write_count() == 1);
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());

        lock.exit_read_lock().unwrap();
        rx.recv().unwrap();
        writer.join().unwrap();
        assert_eq!(lock.waiting_write_count(), 0);
    }

    pub fn single_upgradeable_reader<R: Relax + 'static>() {
        let _trace = trace_init();
        let lock = shared::<R>();
        lock.enter_upgradeable_read_lock().unwrap();
        assert!(lock.is_upgradeable_read_lock_held());
        assert_eq!(lock.recursive_upgrade_count(), 1);

        let (tx, rx) = channel();
        let c_lock = Arc::clone(&lock);
        let other = thread::spawn(move || {
            assert_eq!(c_lock.try_enter_upgradeable_read_lock(0), Ok(false));
            c_lock.enter_upgradeable_read_lock().unwrap();
            tx.send(()).unwrap();
            c_lock.exit_upgradeable_read_lock().unwrap();
        });
        wait_until("the second upgradeable reader waits", || lock.waiting_read_count() == 1);
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());

        lock.exit_upgradeable_read_lock().unwrap();
        rx.recv().unwrap();
        other.join().unwrap();
        assert!(!lock.is_upgradeable_read_lock_held());
    }

    pub fn upgrade_in_place<R: Relax + 'static>() {
        let lock = RwLock::<R>::new();
        lock.enter_upgradeable_read_lock().unwrap();
        assert_eq!(lock.current_read_count(), 1);

        lock.enter_write_lock().unwrap();
        assert!(lock.is_write_lock_held());
        assert!(lock.is_upgradeable_read_lock_held());
        assert_eq!(lock.current_read_count(), 0);

        lock.exit_write_lock().unwrap();
        assert!(!lock.is_write_lock_held());
        assert!(lock.is_upgradeable_read_lock_held());
        assert_eq!(lock.current_read_count(), 1);

        lock.exit_upgradeable_read_lock().unwrap();
        assert_eq!(lock.current_read_count(), 0);
    }

    pub fn upgrade_waits_for_readers<R: Relax + 'static>() {
        let _trace = trace_init();
        let lock = shared::<R>();
        let (upgradeable_tx, upgradeable_rx) = channel();
        let (reader_tx, reader_rx) = channel();
        let (tx, rx) = channel();
        let c_lock = Arc::clone(&lock);
        let upgrader = thread::spawn(move || {
            c_lock.enter_upgradeable_read_lock().unwrap();
            upgradeable_tx.send(()).unwrap();
            reader_rx.recv().unwrap();
            assert_eq!(c_lock.try_enter_write_lock(0), Ok(false));
            c_lock.enter_write_lock().unwrap();
            tx.send(c_lock.current_read_count()).unwrap();
            c_lock.exit_write_lock().unwrap();
            c_lock.exit_upgradeable_read_lock().unwrap();
        });
        upgradeable_rx.recv().unwrap();
        lock.enter_read_lock().unwrap();
        reader_tx.send(()).unwrap();

        wait_until("the upgrade waits", || lock.waiting_upgrade_count() == 1);
        assert_eq!(lock.current_read_count(), 2);
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());

        lock.exit_read_lock().unwrap();
        assert_eq!(rx.recv().unwrap(), 0);
        upgrader.join().unwrap();
        assert_eq!(lock.current_read_count(), 0);
        assert_eq!(lock.waiting_upgrade_count(), 0);
    }

    pub fn read_recursion_rejected<R: Relax + 'static>() {
        let lock = RwLock::<R>::new();
        lock.enter_read_lock().unwrap();
        assert_eq!(lock.enter_read_lock(), Err(recursion(LockMode::Read, LockMode::Read)));
        assert_eq!(lock.try_enter_read_lock(0), Err(recursion(LockMode::Read, LockMode::Read)));
        assert_eq!(lock.current_read_count(), 1);
        assert_eq!(lock.recursive_read_count(), 1);
        lock.exit_read_lock().unwrap();
        assert_eq!(lock.current_read_count(), 0);
        assert_eq!(lock.recursive_read_count(), 0);
    }

    pub fn mode_recursion_rejected<R: Relax + 'static>() {
        let lock = RwLock::<R>::new();

        lock.enter_write_lock().unwrap();
        assert_eq!(lock.enter_write_lock(), Err(recursion(LockMode::Write, LockMode::Write)));
        assert_eq!(lock.enter_read_lock(), Err(recursion(LockMode::Write, LockMode::Read)));
        assert_eq!(
            lock.enter_upgradeable_read_lock(),
            Err(recursion(LockMode::Write, LockMode::UpgradeableRead))
        );
        lock.exit_write_lock().unwrap();

        lock.enter_read_lock().unwrap();
        assert_eq!(lock.enter_write_lock(), Err(recursion(LockMode::Read, LockMode::Write)));
        assert_eq!(
            lock.enter_upgradeable_read_lock(),
            Err(recursion(LockMode::Read, LockMode::UpgradeableRead))
        );
        lock.exit_read_lock().unwrap();

        lock.enter_upgradeable_read_lock().unwrap();
        assert_eq!(
            lock.enter_upgradeable_read_lock(),
            Err(recursion(LockMode::UpgradeableRead, LockMode::UpgradeableRead))
        );
        lock.exit_upgradeable_read_lock().unwrap();

        assert_eq!(lock.current_read_count(), 0);
        assert!(lock.try_enter_write_lock(0).unwrap());
        lock.exit_write_lock().unwrap();
    }

    pub fn unbalanced_exits<R: Relax + 'static>() {
        let lock = RwLock::<R>::new();
        assert_eq!(lock.exit_write_lock(), Err(LockError::UnbalancedExit(LockMode::Write)));
        assert_eq!(lock.exit_read_lock(), Err(LockError::UnbalancedExit(LockMode::Read)));
        assert_eq!(
            lock.exit_upgradeable_read_lock(),
            Err(LockError::UnbalancedExit(LockMode::UpgradeableRead))
        );

        lock.enter_read_lock().unwrap();
        assert_eq!(lock.exit_write_lock(), Err(LockError::UnbalancedExit(LockMode::Write)));
        lock.exit_read_lock().unwrap();
        assert_eq!(lock.exit_read_lock(), Err(LockError::UnbalancedExit(LockMode::Read)));
        assert_eq!(lock.current_read_count(), 0);
    }

    pub fn exits_from_other_thread_are_unbalanced<R: Relax + 'static>() {
        let lock = shared::<R>();
        lock.enter_read_lock().unwrap();
        let c_lock = Arc::clone(&lock);
        let exit = thread::spawn(move || c_lock.exit_read_lock()).join().unwrap();
        assert_eq!(exit, Err(LockError::UnbalancedExit(LockMode::Read)));
        assert_eq!(lock.current_read_count(), 1);
        lock.exit_read_lock().unwrap();

        lock.enter_write_lock().unwrap();
        let c_lock = Arc::clone(&lock);
        let exit = thread::spawn(move || c_lock.exit_write_lock()).join().unwrap();
        assert_eq!(exit, Err(LockError::UnbalancedExit(LockMode::Write)));
        assert!(lock.is_write_lock_held());
        lock.exit_write_lock().unwrap();
    }

    pub fn try_read_zero_does_not_block<R: Relax + 'static>() {
        let lock = shared::<R>();
        lock.enter_write_lock().unwrap();
        let c_lock = Arc::clone(&lock);
        let elapsed = thread::spawn(move || {
            let start = Instant::now();
            assert_eq!(c_lock.try_enter_read_lock(0), Ok(false));
            assert_eq!(c_lock.recursive_read_count(), 0);
            start.elapsed()
        })
        .join()
        .unwrap();
        assert!(elapsed < Duration::from_secs(1), "probe blocked for {elapsed:?}");
        assert_eq!(lock.waiting_read_count(), 0);
        lock.exit_write_lock().unwrap();

        assert_eq!(lock.try_enter_read_lock(0), Ok(true));
        lock.exit_read_lock().unwrap();
    }

    pub fn timed_read_gives_up<R: Relax + 'static>() {
        const TIMEOUT: Duration = Duration::from_millis(50);
        let _trace = trace_init();
        let lock = shared::<R>();
        lock.enter_write_lock().unwrap();

        let c_lock = Arc::clone(&lock);
        let reader = thread::spawn(move || {
            let start = Instant::now();
            let acquired = c_lock.try_enter_read_lock(50).unwrap();
            (acquired, start.elapsed(), c_lock.is_read_lock_held())
        });
        let (acquired, elapsed, held) = reader.join().unwrap();
        assert!(!acquired);
        assert!(!held);
        assert!(elapsed >= TIMEOUT, "gave up after {elapsed:?}");
        assert_eq!(lock.waiting_read_count(), 0);

        lock.exit_write_lock().unwrap();
        let c_lock = Arc::clone(&lock);
        let acquired = thread::spawn(move || {
            let acquired = c_lock.try_enter_read_lock(0);
            c_lock.exit_read_lock().unwrap();
            acquired
        });
        assert_eq!(acquired.join().unwrap(), Ok(true));
    }

    pub fn upgradeable_readers_exclude_each_other<R: Relax + 'static>() {
        const ROUNDS: u32 = 50;
        let lock = shared::<R>();
        let holders = Arc::new(AtomicU32::new(0));
        let handles: Vec<_> = (0..2)
            .map(|upgrades| {
                let (lock, holders) = (Arc::clone(&lock), Arc::clone(&holders));
                thread::spawn(move || {
                    for _ in 0..ROUNDS {
                        lock.enter_upgradeable_read_lock().unwrap();
                        assert_eq!(holders.fetch_add(1, Relaxed), 0);
                        assert!(lock.is_upgradeable_read_lock_held());
                        if upgrades == 0 {
                            lock.enter_write_lock().unwrap();
                            lock.exit_write_lock().unwrap();
                        }
                        assert_eq!(holders.fetch_sub(1, Relaxed), 1);
                        lock.exit_upgradeable_read_lock().unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(lock.current_read_count(), 0);
    }

    pub fn waiting_writer_blocks_new_readers<R: Relax + 'static>() {
        let _trace = trace_init();
        let lock = shared::<R>();
        lock.enter_read_lock().unwrap();

        let c_lock = Arc::clone(&lock);
        let writer = thread::spawn(move || {
            c_lock.enter_write_lock().unwrap();
            c_lock.exit_write_lock().unwrap();
        });
        wait_until("the writer waits", || lock.waiting_write_count() == 1);

        let c_lock = Arc::clone(&lock);
        let probe = thread::spawn(move || c_lock.try_enter_read_lock(0)).join().unwrap();
        assert_eq!(probe, Ok(false));
        let c_lock = Arc::clone(&lock);
        let probe = thread::spawn(move || c_lock.try_enter_upgradeable_read_lock(0));
        assert_eq!(probe.join().unwrap(), Ok(false));

        lock.exit_read_lock().unwrap();
        writer.join().unwrap();
        assert_eq!(lock.current_read_count(), 0);
    }

    pub fn abandoned_writer_releases_readers<R: Relax + 'static>() {
        let _trace = trace_init();
        let lock = shared::<R>();
        lock.enter_read_lock().unwrap();

        let c_lock = Arc::clone(&lock);
        let writer = thread::spawn(move || c_lock.try_enter_write_lock(Duration::from_millis(500)));
        wait_until("the writer waits", || lock.waiting_write_count() == 1);

        let (tx, rx) = channel();
        let c_lock = Arc::clone(&lock);
        let reader = thread::spawn(move || {
            c_lock.enter_read_lock().unwrap();
            tx.send(()).unwrap();
            c_lock.exit_read_lock().unwrap();
        });
        wait_until("the reader waits", || lock.waiting_read_count() == 1);

        assert_eq!(writer.join().unwrap(), Ok(false));
        // The reader was only held back by the writer, it must not wait for
        // this thread to release its own read lock.
        rx.recv_timeout(super::PATIENCE).unwrap();
        reader.join().unwrap();
        lock.exit_read_lock().unwrap();
        assert_eq!(lock.current_read_count(), 0);
    }

    pub fn lots_and_lots_write<R: Relax + 'static>() {
        let lock = shared::<R>();
        // Updated with a non-atomic read-modify-write, only correct if writers
        // are mutually exclusive.
        let value = Arc::new(AtomicU32::new(0));
        let handles: Vec<_> = (0..CONCURRENCY * 2)
            .map(|n| {
                let (lock, value) = (Arc::clone(&lock), Arc::clone(&value));
                thread::spawn(move || {
                    for _ in 0..ITERS {
                        if n % 2 == 0 {
                            lock.enter_write_lock().unwrap();
                            let current = value.load(Relaxed);
                            value.store(current + 1, Relaxed);
                            lock.exit_write_lock().unwrap();
                        } else {
                            lock.enter_upgradeable_read_lock().unwrap();
                            let seen = value.load(Relaxed);
                            lock.enter_write_lock().unwrap();
                            assert_eq!(value.load(Relaxed), seen);
                            value.store(seen + 1, Relaxed);
                            lock.exit_write_lock().unwrap();
                            lock.exit_upgradeable_read_lock().unwrap();
                        }
                        lock.enter_read_lock().unwrap();
                        let _ = value.load(Relaxed);
                        lock.exit_read_lock().unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(value.load(Relaxed), EXPECTED_VALUE);
        assert_eq!(lock.current_read_count(), 0);
    }

    pub fn invalid_timeout<R: Relax + 'static>() {
        let lock = RwLock::<R>::new();
        assert_eq!(lock.try_enter_read_lock(-2), Err(LockError::InvalidTimeout(-2)));
        assert_eq!(lock.try_enter_write_lock(-100), Err(LockError::InvalidTimeout(-100)));
        let millis = i64::from(i32::MAX) + 1;
        assert_eq!(
            lock.try_enter_upgradeable_read_lock(millis),
            Err(LockError::InvalidTimeout(millis))
        );
        assert_eq!(lock.recursive_read_count(), 0);
        assert_eq!(lock.current_read_count(), 0);
        assert_eq!(lock.try_enter_read_lock(-1), Ok(true));
        lock.exit_read_lock().unwrap();
    }

    pub fn disposed<R: Relax + 'static>() {
        let lock = RwLock::<R>::new();
        lock.enter_read_lock().unwrap();
        lock.dispose();
        lock.dispose();
        assert_eq!(lock.exit_read_lock(), Err(LockError::Disposed));
        assert_eq!(lock.enter_read_lock(), Err(LockError::Disposed));
        assert_eq!(lock.try_enter_write_lock(0), Err(LockError::Disposed));
        assert_eq!(lock.enter_upgradeable_read_lock(), Err(LockError::Disposed));
        assert_eq!(lock.exit_write_lock(), Err(LockError::Disposed));
        assert_eq!(lock.exit_upgradeable_read_lock(), Err(LockError::Disposed));
        assert!(!lock.is_read_lock_held());
        assert!(!lock.is_write_lock_held());
        assert!(!lock.is_upgradeable_read_lock_held());
    }

    pub fn unsupported_policy<R: Relax + 'static>() {
        let lock = RwLock::<R>::with_policy(RecursionPolicy::NoRecursion).unwrap();
        assert_eq!(lock.recursion_policy(), RecursionPolicy::NoRecursion);
        assert_eq!(RwLock::<R>::default().recursion_policy(), RecursionPolicy::NoRecursion);
        let error = RwLock::<R>::with_policy(RecursionPolicy::SupportsRecursion).err();
        assert_eq!(error, Some(LockError::UnsupportedPolicy(RecursionPolicy::SupportsRecursion)));
    }

    pub fn downgrade<R: Relax + 'static>() {
        let lock = shared::<R>();
        lock.enter_upgradeable_read_lock().unwrap();

        let c_lock = Arc::clone(&lock);
        let writer = thread::spawn(move || {
            c_lock.enter_write_lock().unwrap();
            c_lock.exit_write_lock().unwrap();
        });
        wait_until("the writer waits", || lock.waiting_write_count() == 1);

        // Admitted despite the waiting writer, which waits on this thread.
        lock.enter_read_lock().unwrap();
        lock.exit_upgradeable_read_lock().unwrap();
        assert!(lock.is_read_lock_held());
        assert!(!lock.is_upgradeable_read_lock_held());
        assert_eq!(lock.current_read_count(), 1);

        lock.exit_read_lock().unwrap();
        writer.join().unwrap();
    }

    pub fn exit_upgradeable_while_upgraded<R: Relax + 'static>() {
        let lock = RwLock::<R>::new();
        lock.enter_upgradeable_read_lock().unwrap();
        lock.enter_write_lock().unwrap();
        assert_eq!(lock.exit_upgradeable_read_lock(), Err(LockError::UpgradeStillHeld));
        assert!(lock.is_write_lock_held());
        lock.exit_write_lock().unwrap();
        lock.exit_upgradeable_read_lock().unwrap();
        assert_eq!(lock.current_read_count(), 0);
    }

    pub fn remaining_time_is_kept_across_wakes<R: Relax + 'static>() {
        const TIMEOUT: Duration = Duration::from_millis(400);
        let _trace = trace_init();
        let lock = shared::<R>();
        lock.enter_upgradeable_read_lock().unwrap();
        lock.enter_read_lock().unwrap();

        let c_lock = Arc::clone(&lock);
        let waiter = thread::spawn(move || {
            let start = Instant::now();
            let acquired = c_lock.try_enter_upgradeable_read_lock(TIMEOUT).unwrap();
            (acquired, start.elapsed())
        });
        wait_until("the upgradeable reader waits", || lock.waiting_read_count() == 1);
        thread::sleep(TIMEOUT / 2);
        // Signals the read queue while the upgradeable slot is still taken.
        lock.exit_read_lock().unwrap();

        let (acquired, elapsed) = waiter.join().unwrap();
        assert!(!acquired);
        assert!(elapsed >= TIMEOUT, "gave up after {elapsed:?}");
        assert!(elapsed < TIMEOUT + TIMEOUT / 2, "waited {elapsed:?} in total");
        assert_eq!(lock.waiting_read_count(), 0);
        lock.exit_upgradeable_read_lock().unwrap();
    }

    pub fn signaled_reader_is_admitted<R: Relax + 'static>() {
        const ROUNDS: usize = 20;
        let _trace = trace_init();
        let lock = shared::<R>();
        for _ in 0..ROUNDS {
            lock.enter_write_lock().unwrap();
            let (tx, rx) = channel();
            let c_lock = Arc::clone(&lock);
            let reader = thread::spawn(move || {
                c_lock.enter_read_lock().unwrap();
                tx.send(()).unwrap();
                c_lock.exit_read_lock().unwrap();
            });
            wait_until("the reader waits", || lock.waiting_read_count() == 1);

            let start = Arc::new(Barrier::new(2));
            let (c_lock, c_start) = (Arc::clone(&lock), Arc::clone(&start));
            let competitor = thread::spawn(move || {
                c_start.wait();
                // Queues on the read queue right behind the release below.
                if c_lock.try_enter_upgradeable_read_lock(Duration::from_secs(2)).unwrap() {
                    c_lock.exit_upgradeable_read_lock().unwrap();
                }
            });
            start.wait();
            lock.exit_write_lock().unwrap();
            lock.enter_upgradeable_read_lock().unwrap();

            let admitted = rx.recv_timeout(Duration::from_secs(1));
            assert!(admitted.is_ok(), "a signaled reader was left waiting");
            reader.join().unwrap();
            lock.exit_upgradeable_read_lock().unwrap();
            competitor.join().unwrap();
        }
        assert_eq!(lock.current_read_count(), 0);
    }

    pub fn waiter_fails_after_dispose<R: Relax + 'static>() {
        let _trace = trace_init();
        let lock = shared::<R>();
        lock.enter_write_lock().unwrap();

        let c_lock = Arc::clone(&lock);
        let reader = thread::spawn(move || c_lock.enter_read_lock());
        let c_lock = Arc::clone(&lock);
        let upgradeable = thread::spawn(move || c_lock.enter_upgradeable_read_lock());
        let writers: Vec<_> = (0..2)
            .map(|_| {
                let c_lock = Arc::clone(&lock);
                thread::spawn(move || c_lock.try_enter_write_lock(Timeout::Infinite))
            })
            .collect();
        wait_until("every thread waits", || {
            lock.waiting_read_count() == 2 && lock.waiting_write_count() == 2
        });

        lock.dispose();
        assert_eq!(reader.join().unwrap(), Err(LockError::Disposed));
        assert_eq!(upgradeable.join().unwrap(), Err(LockError::Disposed));
        for writer in writers {
            assert_eq!(writer.join().unwrap(), Err(LockError::Disposed));
        }
        assert_eq!(lock.waiting_read_count(), 0);
        assert_eq!(lock.waiting_write_count(), 0);
        assert_eq!(lock.exit_write_lock(), Err(LockError::Disposed));
    }

    pub fn test_lock_debug<R: Relax + 'static>() {
        let lock = RwLock::<R>::new();
        lock.enter_read_lock().unwrap();
        let msg = "RwLock { owners: 1, read_waiters: 0, write_waiters: 0, \
                   upgrade_waiters: 0, policy: NoRecursion, disposed: false }";
        assert_eq!(msg, format!("{lock:?}"));
        lock.exit_read_lock().unwrap();
    }

    pub fn read_guard_releases<R: Relax + 'static>() {
        let lock = RwLock::<R>::new();
        {
            let guard = lock.read().unwrap();
            assert!(lock.is_read_lock_held());
            assert!(format!("{guard:?}").starts_with("ReadGuard { lock: RwLock { owners: 1"));
        }
        assert!(!lock.is_read_lock_held());
        assert_eq!(lock.current_read_count(), 0);
    }

    pub fn write_guard_releases<R: Relax + 'static>() {
        let lock = RwLock::<R>::new();
        {
            let _guard = lock.write().unwrap();
            assert!(lock.is_write_lock_held());
            assert!(matches!(lock.read(), Err(LockError::Recursion { .. })));
        }
        assert!(!lock.is_write_lock_held());
        assert!(lock.try_write(0).unwrap().is_some());
        assert!(!lock.is_write_lock_held());
    }

    pub fn upgrade_guard_returns_to_upgradeable<R: Relax + 'static>() {
        let lock = RwLock::<R>::new();
        let mut upgradeable = lock.upgradeable_read().unwrap();
        {
            let _write = upgradeable.upgrade().unwrap();
            assert!(lock.is_write_lock_held());
            assert_eq!(lock.current_read_count(), 0);
        }
        assert!(!lock.is_write_lock_held());
        assert_eq!(lock.current_read_count(), 1);
        assert!(upgradeable.try_upgrade(0).unwrap().is_some());
        drop(upgradeable);
        assert!(!lock.is_upgradeable_read_lock_held());
        assert_eq!(lock.current_read_count(), 0);
    }

    pub fn try_guards_respect_contention<R: Relax + 'static>() {
        let lock = shared::<R>();
        let guard = lock.write().unwrap();
        let c_lock = Arc::clone(&lock);
        thread::spawn(move || {
            assert!(c_lock.try_read(0).unwrap().is_none());
            assert!(c_lock.try_write(Duration::from_millis(5)).unwrap().is_none());
            assert!(c_lock.try_upgradeable_read(0).unwrap().is_none());
        })
        .join()
        .unwrap();
        drop(guard);

        let c_lock = Arc::clone(&lock);
        thread::spawn(move || {
            let upgradeable = c_lock.try_upgradeable_read(0).unwrap();
            assert!(upgradeable.is_some());
            assert!(c_lock.try_read(0).unwrap().is_some());
        })
        .join()
        .unwrap();
        assert_eq!(lock.current_read_count(), 0);
    }

    pub fn guard_drop_after_dispose<R: Relax + 'static>() {
        let _trace = trace_init();
        let lock = RwLock::<R>::new();
        let guard = lock.read().unwrap();
        lock.dispose();
        drop(guard);
        assert_eq!(lock.current_read_count(), 1);
    }
}
