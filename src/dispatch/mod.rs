// src/dispatch/mod.rs
//! Destination dispatcher: routes commands to per-display workers.
//!
//! - A destination is created for every client the registry attaches.
//! - `submit` coalesces by command kind: only the latest pending command of
//!   each kind survives until the destination's worker drains it.
//! - Commands of different kinds pending at the same drain all execute, in
//!   kind order (Display, then SetContrast).
//! - There is no ordering across displays.

mod destination;
mod slots;

pub use destination::{DestinationState, DestinationStats};
pub use slots::SlotTable;

use crate::client::{Client, ClientId};
use crate::command::{Command, CommandSink};
use crate::error::{DispatchError, RegistryError};
use crate::registry::{ListenerId, Registry};
use crate::worker::lock;
use destination::{Destination, Shared};
use log::{debug, error, info, warn};
use std::sync::{Arc, Mutex, Weak};

#[derive(Default)]
struct DestinationTable {
    stopped: bool,
    entries: Vec<Destination>,
}

impl DestinationTable {
    fn find(&self, id: ClientId) -> Option<&Destination> {
        self.entries.iter().find(|d| d.client().id() == id)
    }
}

struct DispatcherInner {
    destinations: Mutex<DestinationTable>,
}

impl DispatcherInner {
    fn on_client_added(&self, client: &Client) {
        let mut table = lock(&self.destinations);
        if table.stopped {
            debug!("Dispatcher: ignoring {} attached during teardown", client);
            return;
        }
        if table.find(client.id()).is_some() {
            warn!("Dispatcher: {} already has a destination", client);
            return;
        }

        match Destination::spawn(client.clone()) {
            Ok(destination) => {
                info!("Dispatcher: destination ready for {}", client);
                table.entries.push(destination);
            }
            Err(e) => {
                error!("Dispatcher: no destination for {}: {:#}", client, e);
            }
        }
    }

    fn shared_for(&self, id: ClientId) -> Result<Arc<Shared>, DispatchError> {
        let table = lock(&self.destinations);
        if table.stopped {
            return Err(DispatchError::Stopped);
        }
        table
            .find(id)
            .map(|d| d.shared().clone())
            .ok_or(DispatchError::Unhandled(id))
    }

    fn submit(&self, command: Command) -> Result<(), DispatchError> {
        let target = command.target();
        let shared = match self.shared_for(target) {
            Ok(shared) => shared,
            Err(e) => {
                warn!("Dispatcher: dropping {:?} command: {}", command.kind(), e);
                command.release();
                return Err(e);
            }
        };

        shared.enqueue(command).map_err(|command| {
            debug!("Dispatcher: destination for {} is stopping", target);
            command.release();
            DispatchError::Stopped
        })
    }

    fn with_shared<T>(&self, id: ClientId, f: impl FnOnce(&Shared) -> T) -> Option<T> {
        let table = lock(&self.destinations);
        table.find(id).map(|d| f(d.shared()))
    }

    fn shutdown(&self) {
        let entries = {
            let mut table = lock(&self.destinations);
            table.stopped = true;
            std::mem::take(&mut table.entries)
        };

        for mut destination in entries {
            debug!("Dispatcher: stopping destination for {}", destination.client());
            destination.shutdown();
        }
    }
}

/// Cheap, cloneable submission handle onto a [`Dispatcher`].
#[derive(Clone)]
pub struct DispatcherHandle {
    inner: Arc<DispatcherInner>,
}

impl CommandSink for DispatcherHandle {
    fn submit(&self, command: Command) -> Result<(), DispatchError> {
        self.inner.submit(command)
    }
}

/// Owns one destination worker per attached display.
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
    registry: Arc<Registry>,
    listener: Option<ListenerId>,
}

impl Dispatcher {
    /// Creates the dispatcher and subscribes it to display attach events.
    pub fn new(registry: Arc<Registry>) -> Result<Self, RegistryError> {
        let inner = Arc::new(DispatcherInner {
            destinations: Mutex::new(DestinationTable::default()),
        });

        let weak: Weak<DispatcherInner> = Arc::downgrade(&inner);
        let listener = registry.add_listener(move |client| {
            if let Some(inner) = weak.upgrade() {
                inner.on_client_added(client);
            }
        })?;

        debug!("Dispatcher: created (listener {:?})", listener);
        Ok(Self {
            inner,
            registry,
            listener: Some(listener),
        })
    }

    pub fn handle(&self) -> DispatcherHandle {
        DispatcherHandle {
            inner: self.inner.clone(),
        }
    }

    /// Same as [`CommandSink::submit`] on a handle.
    pub fn submit(&self, command: Command) -> Result<(), DispatchError> {
        self.inner.submit(command)
    }

    pub fn has_destination(&self, id: ClientId) -> bool {
        self.inner.with_shared(id, |_| ()).is_some()
    }

    pub fn destination_count(&self) -> usize {
        lock(&self.inner.destinations).entries.len()
    }

    pub fn state(&self, id: ClientId) -> Option<DestinationState> {
        self.inner.with_shared(id, Shared::state)
    }

    pub fn stats(&self, id: ClientId) -> Option<DestinationStats> {
        self.inner.with_shared(id, Shared::stats)
    }

    /// Stops every destination. Pending commands are released unexecuted.
    ///
    /// The registry listener is removed first so no display attaches halfway
    /// through teardown.
    pub fn destroy(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if let Some(id) = self.listener.take() {
            self.registry.remove_listener(id);
            self.inner.shutdown();
            info!("Dispatcher: destroyed");
        }
    }
}

impl CommandSink for Dispatcher {
    fn submit(&self, command: Command) -> Result<(), DispatchError> {
        self.inner.submit(command)
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests;
