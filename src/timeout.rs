use core::time::Duration;

use crate::error::LockError;

/// How long a `try_enter_*` call may block before giving up.
///
/// A `Timeout` can be built from milliseconds, where `-1` means [`Infinite`]
/// and `0` means the call never blocks, or from a [`Duration`].
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use slimlock::{LockError, Timeout};
///
/// assert_eq!(Timeout::try_from(-1), Ok(Timeout::Infinite));
/// assert_eq!(Timeout::try_from(0), Ok(Timeout::ZERO));
/// assert_eq!(Timeout::try_from(-2), Err(LockError::InvalidTimeout(-2)));
/// assert_eq!(Timeout::from(Duration::from_millis(50)), Timeout::try_from(50).unwrap());
/// ```
///
/// [`Infinite`]: Timeout::Infinite
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Timeout {
    /// Wait until the lock is acquired.
    Infinite,
    /// Wait for at most this long.
    After(Duration),
}

impl Timeout {
    /// A timeout that makes the call return immediately if the lock cannot be
    /// acquired.
    pub const ZERO: Self = Self::After(Duration::ZERO);

    /// The millisecond value that stands for an infinite timeout.
    pub const INFINITE_MILLIS: i32 = -1;

    /// Returns `true` if this timeout never blocks.
    #[must_use]
    pub fn is_zero(self) -> bool {
        self == Self::ZERO
    }
}

impl Default for Timeout {
    /// Returns [`Timeout::Infinite`].
    fn default() -> Self {
        Self::Infinite
    }
}

impl TryFrom<i64> for Timeout {
    type Error = LockError;

    fn try_from(millis: i64) -> Result<Self, Self::Error> {
        match millis {
            -1 => Ok(Self::Infinite),
            0..=0x7FFF_FFFF => Ok(Self::After(Duration::from_millis(millis.unsigned_abs()))),
            _ => Err(LockError::InvalidTimeout(millis)),
        }
    }
}

impl TryFrom<i32> for Timeout {
    type Error = LockError;

    fn try_from(millis: i32) -> Result<Self, Self::Error> {
        Self::try_from(i64::from(millis))
    }
}

impl From<Duration> for Timeout {
    fn from(duration: Duration) -> Self {
        Self::After(duration)
    }
}

impl From<Option<Duration>> for Timeout {
    /// `None` stands for an infinite timeout.
    fn from(duration: Option<Duration>) -> Self {
        duration.map_or(Self::Infinite, Self::After)
    }
}

#[cfg(all(not(loom), test))]
mod test {
    use core::time::Duration;

    use super::Timeout;
    use crate::error::LockError;

    #[test]
    fn from_millis() {
        assert_eq!(Timeout::try_from(Timeout::INFINITE_MILLIS), Ok(Timeout::Infinite));
        assert_eq!(Timeout::try_from(0), Ok(Timeout::ZERO));
        assert_eq!(Timeout::try_from(50), Ok(Timeout::After(Duration::from_millis(50))));
        assert_eq!(
            Timeout::try_from(i32::MAX),
            Ok(Timeout::After(Duration::from_millis(i32::MAX as u64)))
        );
    }

    #[test]
    fn rejects_negative_millis() {
        assert_eq!(Timeout::try_from(-2), Err(LockError::InvalidTimeout(-2)));
        assert_eq!(Timeout::try_from(i32::MIN), Err(LockError::InvalidTimeout(i32::MIN.into())));
        assert_eq!(Timeout::try_from(-5_i64), Err(LockError::InvalidTimeout(-5)));
    }

    #[test]
    fn rejects_out_of_range_millis() {
        let millis = i64::from(i32::MAX) + 1;
        assert_eq!(Timeout::try_from(millis), Err(LockError::InvalidTimeout(millis)));
    }

    #[test]
    fn from_duration() {
        assert!(Timeout::from(Duration::ZERO).is_zero());
        assert_eq!(Timeout::from(None), Timeout::Infinite);
        assert_eq!(Timeout::from(Some(Duration::from_secs(1))), Timeout::After(Duration::from_secs(1)));
        assert_eq!(Timeout::default(), Timeout::Infinite);
    }
}
