use core::convert::Infallible;
use core::fmt::{self, Display, Formatter};

use crate::policy::RecursionPolicy;

/// The three access modes of a [`RwLock`].
///
/// [`RwLock`]: crate::RwLock
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum LockMode {
    /// Shared read access.
    Read,
    /// Exclusive write access.
    Write,
    /// Shared read access that may be upgraded in place to write access.
    UpgradeableRead,
}

impl Display for LockMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::UpgradeableRead => "upgradeable read",
        })
    }
}

/// Errors returned by [`RwLock`] operations.
///
/// All errors are reported synchronously, before the calling thread blocks or
/// after it has retracted itself from any wait queue, and leave the lock in a
/// consistent state.
///
/// [`RwLock`]: crate::RwLock
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum LockError {
    /// A timeout in milliseconds was negative (other than `-1`) or larger
    /// than `i32::MAX`.
    #[error("timeout must be -1 (infinite) or between 0 and {max} milliseconds, got {0}", max = i32::MAX)]
    InvalidTimeout(i64),

    /// The lock has been disposed.
    #[error("the lock has been disposed")]
    Disposed,

    /// The calling thread requested a mode that it already holds, or one that
    /// would deadlock against a mode it already holds.
    #[error("{requested} lock requested while the {held} lock is held by the same thread")]
    Recursion {
        /// The mode already held by the calling thread.
        held: LockMode,
        /// The mode that was requested.
        requested: LockMode,
    },

    /// An exit was called without a matching, successful enter.
    #[error("{0} lock released without a matching acquisition")]
    UnbalancedExit(LockMode),

    /// The upgradeable read lock was released while the write lock it was
    /// upgraded to is still held.
    #[error("upgradeable read lock released while its upgraded write lock is still held")]
    UpgradeStillHeld,

    /// A second upgrade to write mode was requested while one is already
    /// waiting. Only one pending upgrade is supported, a second one can never
    /// be satisfied.
    #[error("an upgrade to the write lock is already in progress, a second one would deadlock")]
    ConflictingUpgrade,

    /// The requested recursion policy is not supported.
    #[error("recursion policy {0:?} is not implemented")]
    UnsupportedPolicy(RecursionPolicy),
}

impl From<Infallible> for LockError {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}

#[cfg(all(not(loom), test))]
mod test {
    use super::{LockError, LockMode};
    use crate::policy::RecursionPolicy;

    #[test]
    fn messages() {
        assert_eq!(
            LockError::InvalidTimeout(-2).to_string(),
            "timeout must be -1 (infinite) or between 0 and 2147483647 milliseconds, got -2"
        );
        let recursion = LockError::Recursion { held: LockMode::Write, requested: LockMode::Read };
        assert_eq!(
            recursion.to_string(),
            "read lock requested while the write lock is held by the same thread"
        );
        assert_eq!(
            LockError::UnbalancedExit(LockMode::UpgradeableRead).to_string(),
            "upgradeable read lock released without a matching acquisition"
        );
        assert_eq!(
            LockError::UnsupportedPolicy(RecursionPolicy::SupportsRecursion).to_string(),
            "recursion policy SupportsRecursion is not implemented"
        );
    }
}
