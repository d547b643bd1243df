use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;

/// Stream of "fragment changed" signals, each carrying the new fragment.
pub type FragmentChanges = mpsc::UnboundedReceiver<String>;

/// The host's navigation fragment.
///
/// The router reads it at start, writes it on `navigate`, and marks the
/// resolved path active after each committed transition.
pub trait Location: Send + Sync {
    fn fragment(&self) -> String;

    /// Requests a fragment change. The host signals the change separately.
    fn set_fragment(&self, fragment: &str);

    fn mark_active(&self, _path: &str) {}
}

/// In-process [`Location`] that signals changes over a channel.
///
/// Writing the fragment it already holds sends no signal.
#[derive(Debug)]
pub struct MemoryLocation {
    fragment: Mutex<String>,
    active: Mutex<Option<String>>,
    changes: mpsc::UnboundedSender<String>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryLocation {
    pub fn new(initial: impl Into<String>) -> (Self, FragmentChanges) {
        let (changes, receiver) = mpsc::unbounded_channel();
        let location = Self {
            fragment: Mutex::new(initial.into()),
            active: Mutex::new(None),
            changes,
        };
        (location, receiver)
    }

    /// Path last marked active by the router.
    pub fn active(&self) -> Option<String> {
        lock(&self.active).clone()
    }
}

impl Location for MemoryLocation {
    fn fragment(&self) -> String {
        lock(&self.fragment).clone()
    }

    fn set_fragment(&self, fragment: &str) {
        let fragment = fragment.trim();
        let fragment = fragment.strip_prefix('#').unwrap_or(fragment).to_string();
        {
            let mut current = lock(&self.fragment);
            if *current == fragment {
                return;
            }
            current.clone_from(&fragment);
        }
        if self.changes.send(fragment).is_err() {
            tracing::debug!("fragment change dropped: no listener");
        }
    }

    fn mark_active(&self, path: &str) {
        *lock(&self.active) = Some(path.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_fragment_signals_only_real_changes() {
        let (location, mut changes) = MemoryLocation::new("dashboard");

        location.set_fragment("#dashboard");
        assert!(changes.try_recv().is_err());

        location.set_fragment("#stats");
        assert_eq!(changes.try_recv().unwrap(), "stats");
        assert_eq!(location.fragment(), "stats");
    }

    #[test]
    fn mark_active_is_recorded() {
        let (location, _changes) = MemoryLocation::new("");
        assert_eq!(location.active(), None);
        location.mark_active("settings");
        assert_eq!(location.active().as_deref(), Some("settings"));
    }
}
