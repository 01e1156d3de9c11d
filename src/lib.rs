//! A reader-writer lock with three access modes: shared read, exclusive write
//! and a single upgradeable read.
//!
//! The lock keeps its bookkeeping (the number of owners, the identity of the
//! writer and of the upgradeable reader, the waiter counts) behind a tiny spin
//! gate that is only ever held for a few instructions. Threads that find the
//! requested mode unavailable register as waiters, release the gate and block
//! on one of three wait conditions until a release wakes them. The main
//! properties of this design are:
//!
//! - any number of readers may hold the lock at once;
//! - a waiting writer stops new readers from being admitted, so writers are
//!   never starved by a continuous stream of readers;
//! - a single upgradeable reader may coexist with plain readers and later
//!   convert its read slot into the write lock in place, without racing other
//!   writers for it;
//! - acquisitions are strictly non-recursive: requesting a mode that the
//!   calling thread already holds, or one that would deadlock against a mode
//!   it holds, fails immediately instead of hanging;
//! - every blocking acquisition accepts a timeout, including a zero timeout
//!   that never blocks.
//!
//! ## Wake-up order
//!
//! Every release picks a single class of waiters to wake. A pending upgrade
//! goes first, as soon as the upgrader is the only owner left. Then one
//! writer, once the lock is free. Then every reader, as long as no writer
//! holds the lock. Woken readers race to re-check the lock state, their
//! relative order is unspecified.
//!
//! ## Thread affinity
//!
//! Locks are tracked per execution context (see [`ContextId`]): a mode must be
//! released by the same thread that acquired it. The RAII guards returned by
//! [`RwLock::read`], [`RwLock::write`] and [`RwLock::upgradeable_read`] are
//! therefore not [`Send`].
//!
//! ## Locking with a slim reader-writer lock
//!
//! ```
//! use std::sync::Arc;
//! use std::thread;
//!
//! use slimlock::RwLock;
//!
//! let lock = Arc::new(RwLock::new());
//! let c_lock = Arc::clone(&lock);
//!
//! lock.enter_write_lock()?;
//!
//! let reader = thread::spawn(move || {
//!     // Gives up after 10 milliseconds, the writer is still inside.
//!     let acquired = c_lock.try_enter_read_lock(10)?;
//!     assert!(!acquired);
//!     Ok::<_, slimlock::LockError>(())
//! });
//! reader.join().unwrap()?;
//!
//! lock.exit_write_lock()?;
//! assert!(lock.try_enter_read_lock(0)?);
//! lock.exit_read_lock()?;
//! # Ok::<(), slimlock::LockError>(())
//! ```
//!
//! ## Recursion
//!
//! Only [`RecursionPolicy::NoRecursion`] is implemented. Constructing a lock
//! with any other policy fails with [`LockError::UnsupportedPolicy`].
//!
//! ```
//! use slimlock::{LockError, LockMode, RwLock};
//!
//! let lock = RwLock::new();
//! lock.enter_read_lock()?;
//! assert_eq!(
//!     lock.enter_read_lock(),
//!     Err(LockError::Recursion { held: LockMode::Read, requested: LockMode::Read }),
//! );
//! lock.exit_read_lock()?;
//! # Ok::<(), slimlock::LockError>(())
//! ```

#![allow(clippy::doc_markdown)]
#![allow(clippy::module_name_repetitions)]
#![warn(missing_docs)]
#![warn(rust_2024_compatibility)]
#![warn(clippy::undocumented_unsafe_blocks)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod raw;
pub mod relax;

mod context;
mod error;
mod policy;
mod timeout;

pub use context::ContextId;
pub use error::{LockError, LockMode};
pub use policy::RecursionPolicy;
pub use raw::yields::{ReadGuard, RwLock, UpgradeableReadGuard, WriteGuard};
pub use timeout::Timeout;

pub(crate) mod cfg;
pub(crate) mod event;
pub(crate) mod gate;
pub(crate) mod table;

#[cfg(all(not(loom), test))]
pub(crate) mod test;

#[cfg(all(loom, test))]
#[cfg(not(tarpaulin))]
pub(crate) mod loom;
