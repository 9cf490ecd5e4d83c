// src/frame.rs
//! Owned frame buffers with a release hook.
//!
//! A frame travels from a producer, through a Display command and the
//! dispatcher, to a device. Whoever holds it last drops it, and dropping runs
//! the release hook exactly once. Producers use the hook to take buffers back
//! into a pool instead of reallocating every tick.

use std::fmt;
use std::sync::mpsc::{channel, Receiver, Sender};

/// Called with the frame's bytes when the frame is released.
pub type ReleaseHook = Box<dyn FnOnce(Box<[u8]>) + Send>;

/// A packed 1bpp frame buffer.
pub struct Frame {
    bytes: Option<Box<[u8]>>,
    release: Option<ReleaseHook>,
}

impl Frame {
    /// Wraps a buffer that is simply freed on release.
    pub fn new(bytes: Box<[u8]>) -> Self {
        Self {
            bytes: Some(bytes),
            release: None,
        }
    }

    /// Wraps a buffer whose release goes through `release`.
    pub fn with_release(bytes: Box<[u8]>, release: ReleaseHook) -> Self {
        Self {
            bytes: Some(bytes),
            release: Some(release),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.bytes.as_deref().unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }
}

impl Drop for Frame {
    fn drop(&mut self) {
        if let (Some(bytes), Some(release)) = (self.bytes.take(), self.release.take()) {
            release(bytes);
        }
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("len", &self.len())
            .field("pooled", &self.release.is_some())
            .finish()
    }
}

/// Recycles frame buffers of one size.
///
/// Frames handed out by [`FramePool::frame`] return their buffer to the pool
/// when released, so a steady producer allocates only as many buffers as are
/// in flight at once.
pub struct FramePool {
    len: usize,
    returned_tx: Sender<Box<[u8]>>,
    returned_rx: Receiver<Box<[u8]>>,
}

impl FramePool {
    pub fn new(len: usize) -> Self {
        let (returned_tx, returned_rx) = channel();
        Self {
            len,
            returned_tx,
            returned_rx,
        }
    }

    pub fn frame_len(&self) -> usize {
        self.len
    }

    /// Returns a zeroed buffer, reusing a released one when available.
    fn acquire(&self) -> Box<[u8]> {
        match self.returned_rx.try_recv() {
            Ok(mut buffer) => {
                buffer.fill(0);
                buffer
            }
            Err(_) => vec![0u8; self.len].into_boxed_slice(),
        }
    }

    /// Builds a pooled frame whose contents are written by `draw`.
    pub fn frame(&self, draw: impl FnOnce(&mut [u8])) -> Frame {
        let mut buffer = self.acquire();
        draw(&mut buffer);
        let returned = self.returned_tx.clone();
        Frame::with_release(
            buffer,
            Box::new(move |bytes| {
                // The pool may already be gone; the buffer is then just freed.
                let _ = returned.send(bytes);
            }),
        )
    }
}

impl fmt::Debug for FramePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FramePool").field("len", &self.len).finish()
    }
}
