use core::time::Duration;
// Loom has no clock of its own, and its mutexes report poisoning through the
// std types, so these two stay std-only under loom.
use std::sync::PoisonError;
use std::time::Instant;

use crate::cfg::sync::{Condvar, Mutex};
use crate::timeout::Timeout;

/// How a signaled [`Event`] returns to the non-signaled state.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Reset {
    /// A signal releases every waiter that took its ticket before it.
    Manual,
    /// A signal releases a single waiter and is consumed by it.
    Auto,
}

/// The signal state behind the event mutex.
#[derive(Debug, Default)]
struct Signal {
    /// Bumped by every [`Event::set`].
    generation: u64,
    /// Whether the latest signal is still unconsumed.
    pending: bool,
}

/// A blocking wait condition with manual-reset or auto-reset semantics.
///
/// Waiters take a [`ticket`] when they register and only observe signals
/// raised after it. A signal raised between a waiter's registration and its
/// call to [`wait`] is therefore never lost, and a later registration never
/// hides a signal already delivered to an earlier one.
///
/// [`ticket`]: Event::ticket
/// [`wait`]: Event::wait
#[derive(Debug)]
pub(crate) struct Event {
    signal: Mutex<Signal>,
    cond: Condvar,
    reset: Reset,
}

impl Event {
    pub(crate) fn new(reset: Reset) -> Self {
        Self { signal: Mutex::new(Signal::default()), cond: Condvar::new(), reset }
    }

    /// Returns the ticket a new waiter must pass to [`wait`].
    ///
    /// [`wait`]: Event::wait
    pub(crate) fn ticket(&self) -> u64 {
        self.signal.lock().unwrap_or_else(PoisonError::into_inner).generation
    }

    /// Signals the event, waking every waiter for a manual-reset event and a
    /// single one for an auto-reset event.
    pub(crate) fn set(&self) {
        let mut signal = self.signal.lock().unwrap_or_else(PoisonError::into_inner);
        signal.generation = signal.generation.wrapping_add(1);
        signal.pending = true;
        match self.reset {
            Reset::Manual => self.cond.notify_all(),
            Reset::Auto => self.cond.notify_one(),
        }
    }

    /// Blocks until the event is signaled after `ticket` was taken, or until
    /// `deadline` passes.
    ///
    /// Returns `true` if the event was signaled.
    pub(crate) fn wait(&self, ticket: u64, deadline: Deadline) -> bool {
        let mut signal = self.signal.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if signal.pending && signal.generation != ticket {
                if self.reset == Reset::Auto {
                    signal.pending = false;
                }
                return true;
            }
            signal = match deadline.remaining() {
                None => self.cond.wait(signal).unwrap_or_else(PoisonError::into_inner),
                Some(remaining) if remaining.is_zero() => return false,
                Some(remaining) => {
                    let result = self.cond.wait_timeout(signal, remaining);
                    result.unwrap_or_else(PoisonError::into_inner).0
                }
            };
        }
    }
}

/// The point in time at which an acquisition attempt gives up.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Deadline {
    Never,
    At(Instant),
}

impl Deadline {
    /// Returns the deadline that is `timeout` away from now.
    pub(crate) fn after(timeout: Timeout) -> Self {
        match timeout {
            Timeout::Infinite => Self::Never,
            Timeout::After(duration) => {
                Instant::now().checked_add(duration).map_or(Self::Never, Self::At)
            }
        }
    }

    /// Returns the time left until the deadline, `None` if it never expires.
    pub(crate) fn remaining(self) -> Option<Duration> {
        match self {
            Self::Never => None,
            Self::At(at) => Some(at.saturating_duration_since(Instant::now())),
        }
    }

    pub(crate) fn has_expired(self) -> bool {
        self.remaining().is_some_and(|remaining| remaining.is_zero())
    }
}

#[cfg(all(not(loom), test))]
mod test {
    use core::time::Duration;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    use super::{Deadline, Event, Reset};
    use crate::timeout::Timeout;

    #[test]
    fn zero_deadline_has_expired() {
        assert!(Deadline::after(Timeout::ZERO).has_expired());
        assert!(!Deadline::after(Timeout::Infinite).has_expired());
        assert_eq!(Deadline::after(Timeout::Infinite).remaining(), None);
    }

    #[test]
    fn huge_timeout_never_expires() {
        assert_eq!(Deadline::after(Timeout::After(Duration::MAX)), Deadline::Never);
    }

    #[test]
    fn wait_times_out() {
        let event = Event::new(Reset::Auto);
        let start = Instant::now();
        let deadline = Deadline::after(Timeout::After(Duration::from_millis(20)));
        assert!(!event.wait(event.ticket(), deadline));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn signal_before_wait_is_kept() {
        let event = Event::new(Reset::Manual);
        let ticket = event.ticket();
        event.set();
        assert!(event.wait(ticket, Deadline::after(Timeout::ZERO)));
        // Manual reset events stay signaled for earlier tickets.
        assert!(event.wait(ticket, Deadline::after(Timeout::ZERO)));
        assert!(!event.wait(event.ticket(), Deadline::after(Timeout::ZERO)));
    }

    #[test]
    fn later_ticket_keeps_earlier_signal() {
        let event = Arc::new(Event::new(Reset::Manual));
        let ticket = event.ticket();
        let c_event = Arc::clone(&event);
        let waiter = thread::spawn(move || {
            c_event.wait(ticket, Deadline::after(Timeout::After(Duration::from_secs(10))))
        });
        event.set();
        let later = event.ticket();
        assert!(waiter.join().unwrap());
        assert!(!event.wait(later, Deadline::after(Timeout::ZERO)));
    }

    #[test]
    fn auto_reset_releases_one_waiter() {
        let event = Event::new(Reset::Auto);
        let ticket = event.ticket();
        event.set();
        assert!(event.wait(ticket, Deadline::after(Timeout::ZERO)));
        assert!(!event.wait(ticket, Deadline::after(Timeout::ZERO)));
        // A stale signal is not handed to a waiter that arrives after it.
        event.set();
        assert!(!event.wait(event.ticket(), Deadline::after(Timeout::ZERO)));
    }

    #[test]
    fn manual_reset_releases_all_waiters() {
        let event = Arc::new(Event::new(Reset::Manual));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let ticket = event.ticket();
                let event = Arc::clone(&event);
                thread::spawn(move || event.wait(ticket, Deadline::Never))
            })
            .collect();
        event.set();
        for handle in handles {
            assert!(handle.join().unwrap());
        }
    }
}
