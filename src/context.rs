use core::fmt;
use core::num::NonZeroU64;

use crate::cfg::thread::thread_local;

/// An opaque, stable identifier of an execution context.
///
/// Each thread is assigned a distinct `ContextId` the first time it touches a
/// lock, and keeps it for the rest of its life. Identifiers are never reused
/// within a process. They are compared by equality only, and are used by
/// [`RwLock`] to decide ownership and to reject recursive acquisitions.
///
/// [`RwLock`]: crate::RwLock
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct ContextId(NonZeroU64);

thread_local! {
    static CURRENT: ContextId = ContextId::next();
}

impl ContextId {
    /// Returns the identifier of the calling thread.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::thread;
    /// use slimlock::ContextId;
    ///
    /// let here = ContextId::current();
    /// assert_eq!(here, ContextId::current());
    ///
    /// let there = thread::spawn(ContextId::current).join().unwrap();
    /// assert_ne!(here, there);
    /// ```
    #[must_use]
    pub fn current() -> Self {
        CURRENT.with(|id| *id)
    }

    fn next() -> Self {
        // Don't use loom atomics, since this has to go in a static.
        use core::sync::atomic::{AtomicU64, Ordering::Relaxed};

        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        let id = NEXT_ID.fetch_add(1, Relaxed);
        match NonZeroU64::new(id) {
            Some(id) => Self(id),
            None => unreachable!("64-bit context ID counter should not overflow!"),
        }
    }

    /// Returns the numeric value of this identifier.
    #[must_use]
    #[inline]
    pub fn as_u64(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Debug for ContextId {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ContextId(")?;
        fmt::Debug::fmt(&self.0, f)?;
        f.write_str(")")
    }
}

impl fmt::Display for ContextId {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(all(not(loom), test))]
mod test {
    use std::collections::HashSet;
    use std::thread;

    use super::ContextId;

    #[test]
    fn stable_within_thread() {
        assert_eq!(ContextId::current(), ContextId::current());
    }

    #[test]
    fn distinct_across_threads() {
        let ids: HashSet<_> = (0..8)
            .map(|_| thread::spawn(ContextId::current))
            .map(|handle| handle.join().unwrap())
            .chain(Some(ContextId::current()))
            .collect();
        assert_eq!(ids.len(), 9);
    }

    #[test]
    fn formats() {
        let id = ContextId::current();
        assert_eq!(format!("{id:?}"), format!("ContextId({})", id.as_u64()));
        assert_eq!(format!("{id}"), id.as_u64().to_string());
    }
}
