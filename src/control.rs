// src/control.rs
//! One-shot control trigger.
//!
//! Stands in for a write-only control attribute: the first trigger runs the
//! installed callback and removes the attribute, later triggers do nothing.

use crate::worker::lock;
use log::{debug, info};
use std::sync::Mutex;

type Callback = Box<dyn FnOnce() + Send>;

pub struct ControlAttribute {
    name: &'static str,
    callback: Mutex<Option<Callback>>,
}

impl ControlAttribute {
    pub fn new<F>(name: &'static str, callback: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        debug!("ControlAttribute: '{}' created", name);
        Self {
            name,
            callback: Mutex::new(Some(Box::new(callback))),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// True until the attribute has fired or been removed.
    pub fn is_armed(&self) -> bool {
        lock(&self.callback).is_some()
    }

    /// Runs the callback if it has not run yet. Returns whether it ran.
    ///
    /// The callback runs outside the internal lock, so it may touch the
    /// attribute itself.
    pub fn fire(&self) -> bool {
        let callback = lock(&self.callback).take();
        match callback {
            Some(callback) => {
                info!("ControlAttribute: '{}' triggered", self.name);
                callback();
                true
            }
            None => {
                debug!("ControlAttribute: '{}' already triggered", self.name);
                false
            }
        }
    }

    /// Disarms without running the callback.
    pub fn remove(&self) {
        if lock(&self.callback).take().is_some() {
            debug!("ControlAttribute: '{}' removed", self.name);
        }
    }
}
