//! Headless display: accepts frames and contrast changes and only keeps count.

use crate::client::{DisplayDevice, Resolution};
use log::trace;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

pub struct HeadlessDisplay {
    name: String,
    resolution: Resolution,
    frames: AtomicU64,
    contrast: AtomicU8,
}

impl HeadlessDisplay {
    pub fn new(name: impl Into<String>, resolution: Resolution) -> Self {
        Self {
            name: name.into(),
            resolution,
            frames: AtomicU64::new(0),
            contrast: AtomicU8::new(u8::MAX),
        }
    }

    pub fn frames_shown(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    /// Last contrast set, full brightness until the first change.
    pub fn contrast(&self) -> u8 {
        self.contrast.load(Ordering::Relaxed)
    }
}

impl DisplayDevice for HeadlessDisplay {
    fn name(&self) -> &str {
        &self.name
    }

    fn resolution(&self) -> Resolution {
        self.resolution
    }

    fn display(&self, data: &[u8]) {
        let n = self.frames.fetch_add(1, Ordering::Relaxed) + 1;
        trace!("HeadlessDisplay: {} frame {} ({} bytes)", self.name, n, data.len());
    }

    fn set_contrast(&self, level: u8) {
        trace!("HeadlessDisplay: {} contrast {}", self.name, level);
        self.contrast.store(level, Ordering::Relaxed);
    }
}
