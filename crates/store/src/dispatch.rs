//! Serialization of notification phases and callback isolation.

use std::{
    panic::{self, AssertUnwindSafe},
    sync::{Condvar, Mutex, MutexGuard, PoisonError},
    thread::{self, ThreadId},
};

/// Locks `mutex`, recovering the data if a previous holder panicked.
///
/// No store lock is ever held while user code runs, so a poisoned mutex
/// still guards consistent data.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Re-entrant lock held for the whole of a `set_state`/`batch_update`.
///
/// Another thread blocks until the current dispatch is over; the owning
/// thread may enter again from inside a callback.
pub(crate) struct DispatchLock {
    owner: Mutex<Option<(ThreadId, usize)>>,
    released: Condvar,
}

pub(crate) struct DispatchGuard<'a> {
    lock: &'a DispatchLock,
}

impl DispatchLock {
    pub(crate) fn new() -> Self {
        Self {
            owner: Mutex::new(None),
            released: Condvar::new(),
        }
    }

    pub(crate) fn enter(&self) -> DispatchGuard<'_> {
        let me = thread::current().id();
        let mut owner = lock(&self.owner);
        loop {
            match *owner {
                None => {
                    *owner = Some((me, 1));
                    break;
                }
                Some((id, depth)) if id == me => {
                    *owner = Some((id, depth + 1));
                    break;
                }
                Some(_) => {}
            }
            owner = self
                .released
                .wait(owner)
                .unwrap_or_else(PoisonError::into_inner);
        }
        DispatchGuard { lock: self }
    }
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        let mut owner = lock(&self.lock.owner);
        match *owner {
            Some((id, depth)) if depth > 1 => *owner = Some((id, depth - 1)),
            _ => {
                *owner = None;
                self.lock.released.notify_one();
            }
        }
    }
}

/// Runs one callback, logging a panic instead of propagating it.
///
/// Only effective with `panic = "unwind"`.
pub(crate) fn isolate(what: &str, callback: impl FnOnce()) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(callback)) {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        tracing::error!("{what} panicked: {message}");
    }
}
