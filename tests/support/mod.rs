//! Shared fixtures for the integration tests.
//!
//! `RecordingDisplay` stands in for a panel and remembers every call made on
//! it, so tests can assert on what the dispatcher actually executed.

#![allow(dead_code)]

use bootscreen::{DisplayDevice, Resolution};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Display(usize),
    Contrast(u8),
}

pub struct RecordingDisplay {
    name: String,
    resolution: Resolution,
    calls: Mutex<Vec<Call>>,
    frames: Mutex<Vec<Vec<u8>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl RecordingDisplay {
    pub fn new(name: &str, width: u8, height: u8) -> Self {
        Self {
            name: name.to_string(),
            resolution: Resolution::new(width, height),
            calls: Mutex::new(Vec::new()),
            frames: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        lock(&self.calls).clone()
    }

    pub fn frames(&self) -> Vec<Vec<u8>> {
        lock(&self.frames).clone()
    }

    pub fn frame_count(&self) -> usize {
        lock(&self.frames).len()
    }

    pub fn contrasts(&self) -> Vec<u8> {
        lock(&self.calls)
            .iter()
            .filter_map(|c| match c {
                Call::Contrast(level) => Some(*level),
                Call::Display(_) => None,
            })
            .collect()
    }
}

impl DisplayDevice for RecordingDisplay {
    fn name(&self) -> &str {
        &self.name
    }

    fn resolution(&self) -> Resolution {
        self.resolution
    }

    fn display(&self, data: &[u8]) {
        lock(&self.calls).push(Call::Display(data.len()));
        lock(&self.frames).push(data.to_vec());
    }

    fn set_contrast(&self, level: u8) {
        lock(&self.calls).push(Call::Contrast(level));
    }
}

/// Polls `condition` until it holds or `timeout` passes.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}
