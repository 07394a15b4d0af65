//! Deferred deletion of temporary records.
//!
//! An [`ExpiryQueue`] owns one background thread and a deadline map. The
//! engine schedules a delete per temporary record; the thread sleeps until
//! the earliest deadline and fires the expiry callback for everything due.
//! Cancellation removes a pending deadline; it has no effect once the
//! callback has fired. The queue shuts its thread down on drop, so no
//! callback can fire against a torn-down engine.

use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crate::record::RecordId;

struct Shared {
    state: Mutex<QueueState>,
    signal: Condvar,
}

#[derive(Default)]
struct QueueState {
    /// Pending deadline per record id.
    pending: HashMap<RecordId, Instant>,
    shutdown: bool,
}

/// Cancellable scheduled deletes, keyed by record id.
pub struct ExpiryQueue {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ExpiryQueue {
    /// Starts the queue with its worker thread.
    ///
    /// `on_expire` runs on the worker thread for every deadline that
    /// elapses without being cancelled.
    pub fn start<F>(on_expire: F) -> Self
    where
        F: Fn(RecordId) + Send + 'static,
    {
        let shared = Arc::new(Shared {
            state: Mutex::new(QueueState::default()),
            signal: Condvar::new(),
        });

        let worker_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("tomedb-expiry".to_string())
            .spawn(move || run_worker(&worker_shared, on_expire))
            .ok();

        Self {
            shared,
            worker: Mutex::new(handle),
        }
    }

    /// Schedules (or reschedules) a delete for `id` at `deadline`.
    pub fn schedule(&self, id: RecordId, deadline: Instant) {
        let mut state = self.shared.state.lock();
        state.pending.insert(id, deadline);
        drop(state);
        self.shared.signal.notify_all();
    }

    /// Cancels the pending delete for `id`.
    ///
    /// Returns whether a pending deadline was found and removed. Returns
    /// false once the delete has already fired.
    pub fn cancel(&self, id: RecordId) -> bool {
        let mut state = self.shared.state.lock();
        state.pending.remove(&id).is_some()
    }

    /// Number of deadlines still pending.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.shared.state.lock().pending.len()
    }

    /// Stops the worker thread, dropping all pending deadlines.
    pub fn shutdown(&self) {
        {
            let mut state = self.shared.state.lock();
            state.shutdown = true;
            state.pending.clear();
        }
        self.shared.signal.notify_all();

        if let Some(handle) = self.worker.lock().take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ExpiryQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for ExpiryQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpiryQueue")
            .field("pending", &self.pending())
            .finish_non_exhaustive()
    }
}

fn run_worker<F>(shared: &Shared, on_expire: F)
where
    F: Fn(RecordId),
{
    let mut state = shared.state.lock();
    loop {
        if state.shutdown {
            return;
        }

        let next_deadline = state.pending.values().min().copied();
        match next_deadline {
            None => {
                shared.signal.wait(&mut state);
            }
            Some(deadline) if deadline > Instant::now() => {
                shared.signal.wait_until(&mut state, deadline);
            }
            Some(_) => {
                let now = Instant::now();
                let due: Vec<RecordId> = state
                    .pending
                    .iter()
                    .filter(|(_, deadline)| **deadline <= now)
                    .map(|(id, _)| *id)
                    .collect();
                for id in &due {
                    state.pending.remove(id);
                }

                // Fire without holding the lock; the callback takes the
                // engine's own locks.
                drop(state);
                for id in due {
                    on_expire(id);
                }
                state = shared.state.lock();
            }
        }
    }
}
