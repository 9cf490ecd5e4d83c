// src/source/animation.rs
//! Animation source: boot animation on every supported display, followed by
//! a contrast fade-out when finalized.
//!
//! ## Threading Model
//! - Registry fan-out thread: `on_client_added` appends items.
//! - Animation worker: every `frame_interval`, asks each item's generator for
//!   a frame and submits it as a Display command.
//! - Fade worker: submits SetContrast for every item at each level of the
//!   ramp, sleeping `fade_interval` between levels, then exits on its own.
//!
//! The two workers share one slot, guarded by the API lock, so they never run
//! at the same time.

use super::Source;
use crate::anim::{profile_for, AnimationGenerator};
use crate::client::Client;
use crate::command::{Command, CommandSink};
use crate::error::RegistryError;
use crate::registry::{ListenerId, Registry};
use crate::worker::{lock, StopToken, Worker};
use anyhow::Result;
use log::*;
use std::sync::{Arc, Mutex, Weak};
use std::thread;
use std::time::Duration;

/// Timing of the animation and fade workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationTiming {
    pub frame_interval: Duration,
    pub fade_interval: Duration,
    pub fade_start: u8,
    pub fade_step: u8,
}

impl Default for AnimationTiming {
    fn default() -> Self {
        Self {
            frame_interval: Duration::from_millis(200),
            fade_interval: Duration::from_millis(100),
            fade_start: 100,
            fade_step: 10,
        }
    }
}

/// Contrast levels of the fade ramp: `start` down by `step`, ending at 0.
///
/// With the defaults this is 100, 90, ..., 10, 0 (11 levels). A zero step is
/// treated as a single jump to 0.
pub fn fade_levels(start: u8, step: u8) -> Vec<u8> {
    if step == 0 {
        return if start == 0 { vec![0] } else { vec![start, 0] };
    }
    std::iter::successors(Some(start), |&level| {
        (level > 0).then(|| level.saturating_sub(step))
    })
    .collect()
}

/// Lifecycle phase of an [`AnimationSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationState {
    /// No worker has been started.
    Created,
    /// The animation worker is emitting frames.
    Running,
    /// The fade worker was started (it may already have finished its ramp).
    Finalizing,
}

/// A generator bound to the client it animates.
struct AnimationItem {
    client: Client,
    generator: Box<dyn AnimationGenerator>,
}

enum ActiveWorker {
    Idle,
    Animating(Worker),
    Fading(Worker),
}

struct AnimationInner {
    items: Mutex<Vec<AnimationItem>>,
    sink: Arc<dyn CommandSink>,
    timing: AnimationTiming,
}

impl AnimationInner {
    fn on_client_added(&self, client: &Client) {
        let Some(profile) = profile_for(client.resolution()) else {
            warn!(
                "AnimationSource: unsupported client {} (res: {})",
                client.name(),
                client.resolution()
            );
            return;
        };

        let generator = match (profile.create)(client) {
            Ok(generator) => generator,
            Err(e) => {
                error!(
                    "AnimationSource: can't create {} for {}: {:#}",
                    profile.name, client, e
                );
                return;
            }
        };

        lock(&self.items).push(AnimationItem {
            client: client.clone(),
            generator,
        });
        info!("AnimationSource: animating {} with {}", client, profile.name);
    }

    fn emit_frames(&self) {
        let mut items = lock(&self.items);
        for item in items.iter_mut() {
            let frame = match item.generator.next_frame() {
                Ok(frame) => frame,
                Err(e) => {
                    warn!("AnimationSource: no frame for {}: {:#}", item.client, e);
                    continue;
                }
            };
            if let Err(e) = self.sink.submit(Command::display(&item.client, frame)) {
                debug!("AnimationSource: frame for {} not accepted: {}", item.client, e);
            }
        }
    }

    fn emit_contrast(&self, level: u8) {
        let items = lock(&self.items);
        for item in items.iter() {
            if let Err(e) = self.sink.submit(Command::set_contrast(&item.client, level)) {
                debug!(
                    "AnimationSource: contrast {} for {} not accepted: {}",
                    level, item.client, e
                );
            }
        }
    }

    fn animate(&self, token: &StopToken) {
        debug!("AnimationSource: animation thread started");
        while !token.is_stopped() {
            self.emit_frames();
            if token.sleep(self.timing.frame_interval) {
                break;
            }
        }
        debug!("AnimationSource: animation thread stopped");
    }

    fn fade(&self) {
        debug!("AnimationSource: fade thread started");
        for level in fade_levels(self.timing.fade_start, self.timing.fade_step) {
            trace!("AnimationSource: fade level {}", level);
            self.emit_contrast(level);
            thread::sleep(self.timing.fade_interval);
        }
        debug!("AnimationSource: fade thread stopped");
    }
}

/// Boot animation producer.
pub struct AnimationSource {
    inner: Arc<AnimationInner>,
    registry: Arc<Registry>,
    listener: Option<ListenerId>,
    worker: Mutex<ActiveWorker>,
}

impl AnimationSource {
    /// Creates the source and subscribes it to display attach events.
    pub fn new(
        registry: Arc<Registry>,
        sink: Arc<dyn CommandSink>,
        timing: AnimationTiming,
    ) -> Result<Self, RegistryError> {
        let inner = Arc::new(AnimationInner {
            items: Mutex::new(Vec::new()),
            sink,
            timing,
        });

        let weak: Weak<AnimationInner> = Arc::downgrade(&inner);
        let listener = registry.add_listener(move |client| {
            if let Some(inner) = weak.upgrade() {
                inner.on_client_added(client);
            }
        })?;

        debug!("AnimationSource: created (listener {:?})", listener);
        Ok(Self {
            inner,
            registry,
            listener: Some(listener),
            worker: Mutex::new(ActiveWorker::Idle),
        })
    }

    pub fn timing(&self) -> AnimationTiming {
        self.inner.timing
    }

    pub fn state(&self) -> AnimationState {
        match &*lock(&self.worker) {
            ActiveWorker::Idle => AnimationState::Created,
            ActiveWorker::Animating(_) => AnimationState::Running,
            ActiveWorker::Fading(_) => AnimationState::Finalizing,
        }
    }

    /// True once a started fade ramp has run to completion.
    pub fn fade_finished(&self) -> bool {
        matches!(&*lock(&self.worker), ActiveWorker::Fading(w) if w.is_finished())
    }

    /// Number of displays this source animates.
    pub fn item_count(&self) -> usize {
        lock(&self.inner.items).len()
    }

    /// Clients being animated, in attach order.
    pub fn clients(&self) -> Vec<Client> {
        lock(&self.inner.items)
            .iter()
            .map(|item| item.client.clone())
            .collect()
    }

    fn teardown(&mut self) {
        let Some(listener) = self.listener.take() else {
            return;
        };
        self.registry.remove_listener(listener);

        let worker = std::mem::replace(&mut *lock(&self.worker), ActiveWorker::Idle);
        match worker {
            ActiveWorker::Animating(mut w) => w.stop(),
            ActiveWorker::Fading(mut w) => w.join(),
            ActiveWorker::Idle => {}
        }

        let items = std::mem::take(&mut *lock(&self.inner.items));
        info!("AnimationSource: destroyed ({} items)", items.len());
    }
}

impl Source for AnimationSource {
    fn name(&self) -> &'static str {
        "animation"
    }

    fn start(&self) -> Result<()> {
        let mut worker = lock(&self.worker);
        if !matches!(*worker, ActiveWorker::Idle) {
            debug!("AnimationSource: start ignored, a worker already ran");
            return Ok(());
        }

        let inner = self.inner.clone();
        let spawned = Worker::spawn("animation", move |token| inner.animate(&token))?;
        *worker = ActiveWorker::Animating(spawned);
        info!("AnimationSource: started");
        Ok(())
    }

    fn finalize(&self) -> Result<()> {
        let mut worker = lock(&self.worker);
        match std::mem::replace(&mut *worker, ActiveWorker::Idle) {
            ActiveWorker::Animating(mut w) => w.stop(),
            ActiveWorker::Fading(mut w) => {
                debug!("AnimationSource: waiting for the running fade before restarting it");
                w.join();
            }
            ActiveWorker::Idle => {}
        }

        let inner = self.inner.clone();
        let spawned = Worker::spawn("fade", move |_token| inner.fade())?;
        *worker = ActiveWorker::Fading(spawned);
        info!("AnimationSource: finalizing");
        Ok(())
    }

    fn destroy(mut self: Box<Self>) {
        self.teardown();
    }
}

impl Drop for AnimationSource {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_fade_is_eleven_levels_to_zero() {
        assert_eq!(
            fade_levels(100, 10),
            vec![100, 90, 80, 70, 60, 50, 40, 30, 20, 10, 0]
        );
    }

    #[test]
    fn uneven_fade_still_ends_dark() {
        assert_eq!(fade_levels(25, 10), vec![25, 15, 5, 0]);
        assert_eq!(fade_levels(0, 10), vec![0]);
        assert_eq!(fade_levels(40, 0), vec![40, 0]);
    }

    #[test]
    fn default_timing_matches_boot_cadence() {
        let timing = AnimationTiming::default();
        assert_eq!(timing.frame_interval, Duration::from_millis(200));
        assert_eq!(timing.fade_interval, Duration::from_millis(100));
    }
}
