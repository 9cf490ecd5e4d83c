// src/source/framebuffer.rs
//! Framebuffer source: exposes each attached display as an in-memory 1bpp
//! framebuffer that other code writes into.
//!
//! Every mutation of a device's pixels submits a Display command with a copy
//! of the whole buffer. Because the dispatcher keeps only the newest Display
//! per client, a burst of small writes costs at most one panel transfer per
//! drain.

use super::Source;
use crate::anim::bitmap::Bitmap;
use crate::client::{Client, ClientId, Resolution};
use crate::command::{Command, CommandSink};
use crate::error::{FramebufferError, RegistryError};
use crate::frame::FramePool;
use crate::registry::{ListenerId, Registry};
use crate::worker::lock;
use anyhow::Result;
use log::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

struct PixelState {
    pixels: Vec<u8>,
    pool: FramePool,
    blanked: bool,
}

/// In-memory framebuffer bound to one display.
pub struct FramebufferDevice {
    client: Client,
    state: Mutex<PixelState>,
    sink: Arc<dyn CommandSink>,
    closed: AtomicBool,
}

impl FramebufferDevice {
    fn new(client: Client, sink: Arc<dyn CommandSink>) -> Self {
        let len = client.resolution().frame_len();
        Self {
            client,
            state: Mutex::new(PixelState {
                pixels: vec![0; len],
                pool: FramePool::new(len),
                blanked: false,
            }),
            sink,
            closed: AtomicBool::new(false),
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn resolution(&self) -> Resolution {
        self.client.resolution()
    }

    /// Framebuffer size in bytes.
    pub fn len(&self) -> usize {
        self.client.resolution().frame_len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_blanked(&self) -> bool {
        lock(&self.state).blanked
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Copies `bytes` into the framebuffer at `offset`, clamped to its end.
    ///
    /// Returns how many bytes were written.
    pub fn write(&self, offset: usize, bytes: &[u8]) -> Result<usize, FramebufferError> {
        let len = self.len();
        if offset > len {
            return Err(FramebufferError::OffsetOutOfRange { offset, len });
        }
        let count = bytes.len().min(len - offset);
        if count == 0 {
            return Err(FramebufferError::EmptyWrite);
        }

        let mut state = lock(&self.state);
        state.pixels[offset..offset + count].copy_from_slice(&bytes[..count]);
        self.update(&state);
        trace!(
            "FramebufferDevice: {} wrote {} bytes at {}",
            self.client,
            count,
            offset
        );
        Ok(count)
    }

    /// Sets or clears every pixel of the rectangle, clipped to the panel.
    pub fn fill_rect(&self, x: i32, y: i32, w: i32, h: i32, on: bool) {
        let mut state = lock(&self.state);
        Bitmap::new(&mut state.pixels, self.client.resolution()).fill_rect(x, y, w, h, on);
        self.update(&state);
    }

    pub fn clear(&self) {
        let mut state = lock(&self.state);
        state.pixels.fill(0);
        self.update(&state);
    }

    /// Blanking shows an all-dark frame but keeps the pixel contents, which
    /// come back on unblank.
    pub fn blank(&self, blanked: bool) {
        let mut state = lock(&self.state);
        if state.blanked == blanked {
            return;
        }
        state.blanked = blanked;
        debug!(
            "FramebufferDevice: {} {}",
            self.client,
            if blanked { "blanked" } else { "unblanked" }
        );
        self.update(&state);
    }

    /// Copy of the current pixel contents.
    pub fn snapshot(&self) -> Vec<u8> {
        lock(&self.state).pixels.clone()
    }

    // Submitted under the state lock so updates reach the dispatcher in
    // mutation order.
    fn update(&self, state: &PixelState) {
        if self.is_closed() {
            return;
        }
        let frame = state.pool.frame(|buf| {
            if !state.blanked {
                buf.copy_from_slice(&state.pixels);
            }
        });
        if let Err(e) = self.sink.submit(Command::display(&self.client, frame)) {
            debug!("FramebufferDevice: update for {} not accepted: {}", self.client, e);
        }
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

struct FramebufferInner {
    devices: Mutex<Vec<Arc<FramebufferDevice>>>,
    sink: Arc<dyn CommandSink>,
}

impl FramebufferInner {
    fn on_client_added(&self, client: &Client) {
        if client.resolution().width % 8 != 0 {
            warn!(
                "FramebufferSource: {} is not byte aligned, skipping",
                client
            );
            return;
        }
        let device = Arc::new(FramebufferDevice::new(client.clone(), self.sink.clone()));
        lock(&self.devices).push(device);
        info!("FramebufferSource: framebuffer ready for {}", client);
    }
}

/// Producer that hands displays over to framebuffer writers.
pub struct FramebufferSource {
    inner: Arc<FramebufferInner>,
    registry: Arc<Registry>,
    listener: Option<ListenerId>,
}

impl FramebufferSource {
    /// Creates the source and adopts every display that is already attached.
    pub fn new(registry: Arc<Registry>, sink: Arc<dyn CommandSink>) -> Result<Self, RegistryError> {
        let inner = Arc::new(FramebufferInner {
            devices: Mutex::new(Vec::new()),
            sink,
        });

        let weak: Weak<FramebufferInner> = Arc::downgrade(&inner);
        let listener = registry.add_listener_with_replay(move |client| {
            if let Some(inner) = weak.upgrade() {
                inner.on_client_added(client);
            }
        })?;

        Ok(Self {
            inner,
            registry,
            listener: Some(listener),
        })
    }

    /// Devices in attach order.
    pub fn devices(&self) -> Vec<Arc<FramebufferDevice>> {
        lock(&self.inner.devices).clone()
    }

    pub fn device_for(&self, id: ClientId) -> Option<Arc<FramebufferDevice>> {
        lock(&self.inner.devices)
            .iter()
            .find(|d| d.client().id() == id)
            .cloned()
    }

    fn teardown(&mut self) {
        let Some(listener) = self.listener.take() else {
            return;
        };
        self.registry.remove_listener(listener);

        let devices = std::mem::take(&mut *lock(&self.inner.devices));
        for device in &devices {
            device.close();
        }
        info!("FramebufferSource: destroyed ({} devices)", devices.len());
    }
}

impl Source for FramebufferSource {
    fn name(&self) -> &'static str {
        "framebuffer"
    }

    fn start(&self) -> Result<()> {
        Ok(())
    }

    fn finalize(&self) -> Result<()> {
        Ok(())
    }

    fn destroy(mut self: Box<Self>) {
        self.teardown();
    }
}

impl Drop for FramebufferSource {
    fn drop(&mut self) {
        self.teardown();
    }
}
