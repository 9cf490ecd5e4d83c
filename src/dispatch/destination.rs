// src/dispatch/destination.rs
//! One destination per attached display: a slot table, a wake signal and a
//! worker thread that drains the table.
//!
//! State per destination:
//!
//! ```text
//! Idle ──submit──► Pending ──wake──► Draining ──done──► Idle
//!   └──────────────────┴──────shutdown─────────────────► Stopped
//! ```
//!
//! The worker swaps the whole table out under the lock and executes outside
//! it, so a slow `display()` (an I2C transfer, say) never blocks submitters.

use super::slots::SlotTable;
use crate::client::Client;
use crate::command::Command;
use crate::worker::{lock, Worker};
use anyhow::Result;
use log::{debug, trace};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};

/// Observable phase of a destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationState {
    /// Nothing pending, worker blocked on the wake signal.
    Idle,
    /// At least one slot occupied, worker not yet draining it.
    Pending,
    /// Worker is executing a drained batch.
    Draining,
    /// Worker has been told to exit.
    Stopped,
}

/// Counters kept per destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DestinationStats {
    /// Commands accepted by `enqueue`.
    pub submitted: u64,
    /// Commands replaced by a newer command of the same kind before a drain.
    pub superseded: u64,
    /// Commands executed on the device.
    pub executed: u64,
    /// Commands released without executing at shutdown.
    pub discarded: u64,
    /// Completed drains.
    pub drains: u64,
}

#[derive(Default)]
struct Counters {
    submitted: AtomicU64,
    superseded: AtomicU64,
    executed: AtomicU64,
    discarded: AtomicU64,
    drains: AtomicU64,
}

#[derive(Default)]
struct QueueState {
    slots: SlotTable,
    signaled: bool,
    draining: bool,
    stopping: bool,
}

/// State shared between submitters and the destination worker.
#[derive(Default)]
pub(crate) struct Shared {
    queue: Mutex<QueueState>,
    wake: Condvar,
    counters: Counters,
}

impl Shared {
    /// Coalesces `command` into the slot table and wakes the worker.
    ///
    /// Returns the command back if the destination is already stopping.
    pub(crate) fn enqueue(&self, command: Command) -> Result<(), Command> {
        let superseded = {
            let mut queue = lock(&self.queue);
            if queue.stopping {
                return Err(command);
            }
            let superseded = queue.slots.insert(command);
            queue.signaled = true;
            self.wake.notify_one();
            superseded
        };

        self.counters.submitted.fetch_add(1, Ordering::Relaxed);
        if let Some(old) = superseded {
            trace!("Destination: superseded pending {:?} command", old.kind());
            self.counters.superseded.fetch_add(1, Ordering::Relaxed);
            old.release();
        }
        Ok(())
    }

    pub(crate) fn state(&self) -> DestinationState {
        let queue = lock(&self.queue);
        if queue.stopping {
            DestinationState::Stopped
        } else if queue.draining {
            DestinationState::Draining
        } else if !queue.slots.is_empty() {
            DestinationState::Pending
        } else {
            DestinationState::Idle
        }
    }

    pub(crate) fn stats(&self) -> DestinationStats {
        let c = &self.counters;
        DestinationStats {
            submitted: c.submitted.load(Ordering::Relaxed),
            superseded: c.superseded.load(Ordering::Relaxed),
            executed: c.executed.load(Ordering::Relaxed),
            discarded: c.discarded.load(Ordering::Relaxed),
            drains: c.drains.load(Ordering::Relaxed),
        }
    }

    /// Blocks until there is work or a stop request.
    ///
    /// Returns the drained batch, or `None` once stopping. Residual commands
    /// found at stop are released without executing.
    fn next_batch(&self) -> Option<SlotTable> {
        let mut queue = lock(&self.queue);
        while !queue.signaled && !queue.stopping {
            queue = self
                .wake
                .wait(queue)
                .unwrap_or_else(PoisonError::into_inner);
        }

        if queue.stopping {
            let residual = queue.slots.take();
            drop(queue);
            self.discard(residual);
            return None;
        }

        queue.signaled = false;
        queue.draining = true;
        Some(queue.slots.take())
    }

    fn finish_batch(&self) {
        lock(&self.queue).draining = false;
        self.counters.drains.fetch_add(1, Ordering::Relaxed);
    }

    fn discard(&self, residual: SlotTable) {
        let released = residual.release_all();
        if released > 0 {
            debug!("Destination: released {} pending commands unexecuted", released);
            self.counters
                .discarded
                .fetch_add(released as u64, Ordering::Relaxed);
        }
    }

    /// Marks the destination stopped, releases anything pending and wakes
    /// the worker so it can observe the stop.
    fn request_stop(&self) {
        let residual = {
            let mut queue = lock(&self.queue);
            queue.stopping = true;
            self.wake.notify_all();
            queue.slots.take()
        };
        self.discard(residual);
    }
}

/// Per-display record owned by the dispatcher.
pub(crate) struct Destination {
    client: Client,
    shared: Arc<Shared>,
    worker: Option<Worker>,
}

impl Destination {
    /// Creates the record and starts its worker thread.
    pub(crate) fn spawn(client: Client) -> Result<Self> {
        let shared = Arc::new(Shared::default());
        let worker_shared = shared.clone();
        let worker_client = client.clone();
        let name = format!("dest-{}", client.id().0);

        let worker = Worker::spawn(&name, move |_token| {
            Self::run(worker_client, worker_shared);
        })?;

        Ok(Self {
            client,
            shared,
            worker: Some(worker),
        })
    }

    fn run(client: Client, shared: Arc<Shared>) {
        debug!("Destination: worker for {} started", client);

        while let Some(batch) = shared.next_batch() {
            trace!("Destination: draining {} commands for {}", batch.len(), client);
            for command in batch.into_commands() {
                command.execute();
                shared.counters.executed.fetch_add(1, Ordering::Relaxed);
            }
            shared.finish_batch();
        }

        debug!("Destination: worker for {} stopped", client);
    }

    pub(crate) fn client(&self) -> &Client {
        &self.client
    }

    pub(crate) fn shared(&self) -> &Arc<Shared> {
        &self.shared
    }

    /// Releases pending commands, then signals and joins the worker.
    pub(crate) fn shutdown(&mut self) {
        self.shared.request_stop();
        if let Some(mut worker) = self.worker.take() {
            worker.join();
        }
    }
}

impl Drop for Destination {
    fn drop(&mut self) {
        self.shutdown();
    }
}
