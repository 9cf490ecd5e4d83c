// src/client.rs
//! Display clients: the endpoints that frames and contrast changes end up on.
//!
//! A hardware driver implements [`DisplayDevice`] and hands it to the
//! registry. The core never owns the panel; it only holds shared references
//! for as long as the client stays attached.

use std::fmt;
use std::sync::Arc;

/// Panel size in pixels. Both dimensions fit in a byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resolution {
    pub width: u8,
    pub height: u8,
}

impl Resolution {
    pub const fn new(width: u8, height: u8) -> Self {
        Self { width, height }
    }

    /// Size in bytes of a 1bpp frame at this resolution.
    pub fn frame_len(&self) -> usize {
        (self.width as usize * self.height as usize).div_ceil(8)
    }

    /// Bytes per pixel row of a 1bpp frame.
    pub fn stride(&self) -> usize {
        (self.width as usize).div_ceil(8)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Capabilities a display driver exposes to the core.
///
/// Both calls are made synchronously from dispatcher worker threads. They may
/// block on physical I/O but must not call back into the core.
pub trait DisplayDevice: Send + Sync {
    /// Human readable device name, used in logs and thread names.
    fn name(&self) -> &str;

    fn resolution(&self) -> Resolution;

    /// Show a packed 1bpp frame (row-major, LSB first).
    fn display(&self, data: &[u8]);

    /// Set panel contrast, 0 (dark) to 255 (brightest).
    fn set_contrast(&self, level: u8);
}

/// Identity of an attached client, assigned by the registry in attach order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub u32);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An attached display: identity plus a shared handle to its device.
#[derive(Clone)]
pub struct Client {
    id: ClientId,
    resolution: Resolution,
    device: Arc<dyn DisplayDevice>,
}

impl Client {
    pub fn new(id: ClientId, device: Arc<dyn DisplayDevice>) -> Self {
        let resolution = device.resolution();
        Self {
            id,
            resolution,
            device,
        }
    }

    pub fn id(&self) -> ClientId {
        self.id
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn name(&self) -> &str {
        self.device.name()
    }

    pub fn display(&self, data: &[u8]) {
        self.device.display(data);
    }

    pub fn set_contrast(&self, level: u8) {
        self.device.set_contrast(level);
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("id", &self.id)
            .field("name", &self.device.name())
            .field("resolution", &self.resolution)
            .finish()
    }
}

impl fmt::Display for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.device.name(), self.id, self.resolution)
    }
}
