// src/registry.rs
//! Client registry: the set of attached displays plus attach listeners.
//!
//! The registry is an explicit context object. Components that care about new
//! displays (the dispatcher, producers) subscribe with a listener and are
//! called synchronously, in attach order, before `add_client` returns.
//!
//! ## Locking
//! Two locks are involved:
//! - `state` guards the client and listener sets and is only held for O(1)
//!   bookkeeping, never while a listener runs.
//! - `fanout` serialises attach notifications so that listeners observe
//!   clients strictly in `add_client` order.
//!
//! Listeners are invoked on a snapshot of the listener set taken under
//! `state`, so a listener may add or remove listeners. A listener must not
//! call `add_client` (that would wait on `fanout` forever) and should not
//! block.

use crate::client::{Client, ClientId, DisplayDevice};
use crate::error::RegistryError;
use crate::worker::lock;
use log::{debug, info, warn};
use std::sync::{Arc, Mutex};

/// Callback run when a display attaches.
pub type Listener = Arc<dyn Fn(&Client) + Send + Sync>;

/// Handle used to unsubscribe a listener. Ids start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u32);

#[derive(Default)]
struct RegistryState {
    initialized: bool,
    clients: Vec<Client>,
    listeners: Vec<(ListenerId, Listener)>,
    last_listener_id: u32,
    last_client_id: u32,
}

/// Registry of attached displays and the parties interested in them.
#[derive(Default)]
pub struct Registry {
    fanout: Mutex<()>,
    state: Mutex<RegistryState>,
}

impl Registry {
    /// Creates an uninitialized registry. Call [`initialize`](Self::initialize)
    /// before use.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates and initializes a registry in one step.
    pub fn initialized() -> Arc<Self> {
        let registry = Self::new();
        lock(&registry.state).initialized = true;
        Arc::new(registry)
    }

    /// Makes the registry live with empty client and listener sets.
    ///
    /// Fails with [`RegistryError::AlreadyInitialized`] if it is already live.
    pub fn initialize(&self) -> Result<(), RegistryError> {
        let mut state = lock(&self.state);
        if state.initialized {
            return Err(RegistryError::AlreadyInitialized);
        }

        state.clients.clear();
        state.listeners.clear();
        state.last_listener_id = 0;
        state.initialized = true;
        debug!("Registry: initialized");
        Ok(())
    }

    /// Attaches a display and notifies every listener with it.
    ///
    /// Returns the attached client. Listeners have all run by the time this
    /// returns.
    pub fn add_client(&self, device: Arc<dyn DisplayDevice>) -> Result<Client, RegistryError> {
        if device.resolution().is_empty() {
            warn!(
                "Registry: rejecting '{}' with empty resolution {}",
                device.name(),
                device.resolution()
            );
            return Err(RegistryError::InvalidClient("empty resolution"));
        }

        let _fanout = lock(&self.fanout);

        let (client, listeners) = {
            let mut state = lock(&self.state);
            if !state.initialized {
                return Err(RegistryError::NotInitialized);
            }
            state.last_client_id += 1;
            let client = Client::new(ClientId(state.last_client_id), device);
            state.clients.push(client.clone());
            let listeners: Vec<Listener> =
                state.listeners.iter().map(|(_, l)| l.clone()).collect();
            (client, listeners)
        };

        info!("Registry: attached {}", client);
        for listener in &listeners {
            listener(&client);
        }

        Ok(client)
    }

    /// Subscribes to attach notifications.
    pub fn add_listener<F>(&self, listener: F) -> Result<ListenerId, RegistryError>
    where
        F: Fn(&Client) + Send + Sync + 'static,
    {
        let mut state = lock(&self.state);
        Self::insert_listener(&mut state, Arc::new(listener))
    }

    /// Subscribes and immediately replays every attached client, in attach
    /// order, to the new listener.
    ///
    /// Replay is serialised with attach fan-out, so a client attaching
    /// concurrently is seen exactly once.
    pub fn add_listener_with_replay<F>(&self, listener: F) -> Result<ListenerId, RegistryError>
    where
        F: Fn(&Client) + Send + Sync + 'static,
    {
        let _fanout = lock(&self.fanout);
        let listener: Listener = Arc::new(listener);

        let (id, clients) = {
            let mut state = lock(&self.state);
            let id = Self::insert_listener(&mut state, listener.clone())?;
            (id, state.clients.clone())
        };

        debug!("Registry: replaying {} clients to {:?}", clients.len(), id);
        for client in &clients {
            listener(client);
        }
        Ok(id)
    }

    fn insert_listener(
        state: &mut RegistryState,
        listener: Listener,
    ) -> Result<ListenerId, RegistryError> {
        if !state.initialized {
            return Err(RegistryError::NotInitialized);
        }
        state.last_listener_id += 1;
        let id = ListenerId(state.last_listener_id);
        state.listeners.push((id, listener));
        debug!("Registry: added listener {:?}", id);
        Ok(id)
    }

    /// Unsubscribes the listener with `id`. Unknown ids are ignored.
    pub fn remove_listener(&self, id: ListenerId) {
        let mut state = lock(&self.state);
        if let Some(pos) = state.listeners.iter().position(|(lid, _)| *lid == id) {
            state.listeners.remove(pos);
            debug!("Registry: removed listener {:?}", id);
        }
    }

    /// Snapshot of attached clients in attach order.
    pub fn clients(&self) -> Vec<Client> {
        lock(&self.state).clients.clone()
    }

    pub fn is_attached(&self, id: ClientId) -> bool {
        lock(&self.state).clients.iter().any(|c| c.id() == id)
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.state).listeners.len()
    }

    pub fn is_initialized(&self) -> bool {
        lock(&self.state).initialized
    }

    /// Drops all clients and listeners and resets the listener id counter.
    /// The registry can be initialized again afterwards.
    pub fn destroy(&self) {
        let _fanout = lock(&self.fanout);
        let mut state = lock(&self.state);
        let clients = state.clients.len();
        let listeners = state.listeners.len();
        state.clients.clear();
        state.listeners.clear();
        state.last_listener_id = 0;
        state.initialized = false;
        debug!(
            "Registry: destroyed ({} clients, {} listeners)",
            clients, listeners
        );
    }
}

#[cfg(test)]
mod tests;
