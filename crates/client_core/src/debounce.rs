//! Rate limiting for bursty input sources.
//!
//! Two separate strategies: [`WindowDebouncer`] lets one event through per window and drops the
//! rest, [`TrailingDebouncer`] waits for a quiet period and acts only on the latest event.

use std::{
    collections::HashMap,
    future::Future,
    hash::Hash,
    sync::{Mutex, MutexGuard},
    time::Duration,
};

use tokio::{task::JoinHandle, time::Instant};

pub const COLOR_WINDOW: Duration = Duration::from_millis(250);
pub const CUSTOM_STATUS_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputSource {
    ColorPicker,
    CustomStatus,
}

pub struct WindowDebouncer<K> {
    window: Duration,
    last_allowed: Mutex<HashMap<K, Instant>>,
}

impl<K: Eq + Hash> WindowDebouncer<K> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_allowed: Mutex::new(HashMap::new()),
        }
    }

    /// Returns true and opens a new window when the previous allowed event of `source` is at
    /// least one window old. Suppressed events are not remembered.
    pub fn try_acquire(&self, source: K) -> bool {
        let now = Instant::now();
        let mut last_allowed = lock(&self.last_allowed);
        match last_allowed.get(&source) {
            Some(previous) if now.duration_since(*previous) < self.window => false,
            _ => {
                last_allowed.insert(source, now);
                true
            }
        }
    }
}

pub struct TrailingDebouncer<K> {
    delay: Duration,
    pending: Mutex<HashMap<K, JoinHandle<()>>>,
}

impl<K: Eq + Hash> TrailingDebouncer<K> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Replaces any pending action of `source` with `action`, to run after the delay.
    ///
    /// Only the waiting phase is cancellable: once the delay elapses the action runs on its own
    /// task, so a later `schedule` never aborts a request already in flight.
    pub fn schedule<F>(&self, source: K, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let delay = self.delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tokio::spawn(action);
        });
        if let Some(previous) = lock(&self.pending).insert(source, handle) {
            previous.abort();
        }
    }

    /// Cancels the pending action of `source`. Returns whether one was still waiting.
    pub fn cancel(&self, source: &K) -> bool {
        match lock(&self.pending).remove(source) {
            Some(handle) => {
                let waiting = !handle.is_finished();
                handle.abort();
                waiting
            }
            None => false,
        }
    }

    pub fn is_pending(&self, source: &K) -> bool {
        lock(&self.pending)
            .get(source)
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl<K> Drop for TrailingDebouncer<K> {
    fn drop(&mut self) {
        let pending = self
            .pending
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for (_, handle) in pending.drain() {
            handle.abort();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
