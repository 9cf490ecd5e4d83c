// src/worker.rs
//! Named worker threads with cooperative cancellation.
//!
//! Every background loop in the crate (destination drains, animation ticks,
//! the fade ramp) runs on a [`Worker`]. A worker owns its join handle, so
//! dropping it always signals and joins the thread: no thread outlives the
//! component that started it.

use anyhow::{Context, Result};
use log::{debug, error};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Locks `mutex`, recovering the guard if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Shared stop flag that also interrupts sleeps.
#[derive(Clone, Default)]
pub struct StopToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        let (flag, cvar) = &*self.inner;
        *lock(flag) = true;
        cvar.notify_all();
    }

    pub fn is_stopped(&self) -> bool {
        *lock(&self.inner.0)
    }

    /// Sleeps for `duration` unless stopped first.
    ///
    /// Returns `true` if the token was stopped before or during the sleep.
    pub fn sleep(&self, duration: Duration) -> bool {
        let (flag, cvar) = &*self.inner;
        let deadline = Instant::now() + duration;
        let mut stopped = lock(flag);

        while !*stopped {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            stopped = cvar
                .wait_timeout(stopped, remaining)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        true
    }
}

/// A running background thread plus the token that stops it.
pub struct Worker {
    name: String,
    token: StopToken,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    /// Spawns `body` on a new thread called `name`.
    pub fn spawn<F>(name: &str, body: F) -> Result<Self>
    where
        F: FnOnce(StopToken) + Send + 'static,
    {
        let token = StopToken::new();
        let thread_token = token.clone();
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || body(thread_token))
            .with_context(|| format!("Failed to spawn {} thread", name))?;

        debug!("Worker: spawned '{}'", name);
        Ok(Self {
            name: name.to_string(),
            token,
            handle: Some(handle),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn token(&self) -> &StopToken {
        &self.token
    }

    /// True once the thread body has returned (or was already joined).
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Requests a stop and waits for the thread to exit.
    pub fn stop(&mut self) {
        self.token.stop();
        self.join();
    }

    /// Waits for the thread to exit without requesting a stop.
    pub fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.join() {
                error!("Worker: '{}' thread panicked: {:?}", self.name, e);
            } else {
                debug!("Worker: '{}' joined", self.name);
            }
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.stop();
    }
}
