/// Whether a thread may re-acquire a mode of a lock that it already holds.
///
/// Only [`NoRecursion`] is implemented. Constructing a lock with any other
/// policy fails with [`LockError::UnsupportedPolicy`].
///
/// [`NoRecursion`]: RecursionPolicy::NoRecursion
/// [`LockError::UnsupportedPolicy`]: crate::LockError::UnsupportedPolicy
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum RecursionPolicy {
    /// Recursive acquisitions are rejected with [`LockError::Recursion`].
    ///
    /// [`LockError::Recursion`]: crate::LockError::Recursion
    #[default]
    NoRecursion,
    /// Recursive acquisitions are allowed. Not implemented.
    SupportsRecursion,
}
