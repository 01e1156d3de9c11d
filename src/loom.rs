pub mod models {
    use loom::cell::UnsafeCell;
    use loom::sync::Arc;
    use loom::{model, thread};

    use crate::raw::RwLock;
    use crate::relax::Relax;

    type Int = usize;

    /// An integer whose accesses are only sound under the lock.
    struct Shared<R> {
        lock: RwLock<R>,
        value: UnsafeCell<Int>,
    }

    // SAFETY: `value` is only accessed under `lock`, which serializes writers
    // against every other mode.
    unsafe impl<R> Sync for Shared<R> {}

    impl<R: Relax> Shared<R> {
        fn new() -> Arc<Self> {
            Arc::new(Self { lock: RwLock::new(), value: UnsafeCell::new(0) })
        }

        /// Increments the integer under the write lock.
        fn inc(&self) {
            self.lock.enter_write_lock().unwrap();
            // SAFETY: The write lock is held.
            self.value.with_mut(|value| unsafe { *value += 1 });
            self.lock.exit_write_lock().unwrap();
        }

        /// Reads the integer under the read lock.
        fn get(&self) -> Int {
            self.lock.enter_read_lock().unwrap();
            // SAFETY: The read lock is held, writers are excluded.
            let value = self.value.with(|value| unsafe { *value });
            self.lock.exit_read_lock().unwrap();
            value
        }

        /// Increments the integer by upgrading the upgradeable read lock.
        fn upgrade_inc(&self) {
            self.lock.enter_upgradeable_read_lock().unwrap();
            // SAFETY: The upgradeable read lock is held, writers are excluded.
            let seen = self.value.with(|value| unsafe { *value });
            self.lock.enter_write_lock().unwrap();
            // SAFETY: The write lock is held.
            self.value.with_mut(|value| unsafe { *value = seen + 1 });
            self.lock.exit_write_lock().unwrap();
            self.lock.exit_upgradeable_read_lock().unwrap();
        }
    }

    /// Evaluates that concurrent writers serialize all mutations against the
    /// shared data, therefore no data races.
    pub fn write_join<R: Relax + 'static>() {
        model(|| {
            const RUNS: Int = 2;
            let shared = Shared::<R>::new();
            let handles: Vec<_> = (0..RUNS)
                .map(|_| {
                    let shared = Arc::clone(&shared);
                    thread::spawn(move || shared.inc())
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }
            assert_eq!(RUNS, shared.get());
        });
    }

    /// Evaluates that a reader never observes a write in progress and that
    /// the writer is eventually admitted.
    pub fn read_write_join<R: Relax + 'static>() {
        model(|| {
            let shared = Shared::<R>::new();
            let c_shared = Arc::clone(&shared);
            let writer = thread::spawn(move || c_shared.inc());
            let seen = shared.get();
            assert!(seen <= 1);
            writer.join().unwrap();
            assert_eq!(1, shared.get());
        });
    }

    /// Evaluates that an in-place upgrade excludes a concurrent writer and
    /// that neither increment is lost.
    pub fn upgrade_join<R: Relax + 'static>() {
        model(|| {
            let shared = Shared::<R>::new();
            let c_shared = Arc::clone(&shared);
            let upgrader = thread::spawn(move || c_shared.upgrade_inc());
            shared.inc();
            upgrader.join().unwrap();
            assert_eq!(2, shared.get());
        });
    }
}
