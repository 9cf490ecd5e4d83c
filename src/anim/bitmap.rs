// src/anim/bitmap.rs
//! Drawing on packed 1bpp buffers.
//!
//! Layout: row-major, `stride = ceil(width / 8)` bytes per row, pixel `x` of a
//! row lives in bit `x % 8` (least significant first) of byte `x / 8`.
//! Out-of-bounds coordinates are clipped silently.

use crate::client::Resolution;

/// Mutable 1bpp view over a frame buffer.
pub struct Bitmap<'a> {
    buf: &'a mut [u8],
    width: i32,
    height: i32,
    stride: usize,
}

impl<'a> Bitmap<'a> {
    /// Wraps `buf`, which must hold at least `resolution.frame_len()` bytes.
    pub fn new(buf: &'a mut [u8], resolution: Resolution) -> Self {
        debug_assert!(buf.len() >= resolution.frame_len(), "buffer too small");
        Self {
            buf,
            width: resolution.width as i32,
            height: resolution.height as i32,
            stride: resolution.stride(),
        }
    }

    fn locate(&self, x: i32, y: i32) -> Option<(usize, u8)> {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return None;
        }
        let byte = y as usize * self.stride + x as usize / 8;
        let mask = 1u8 << (x as usize % 8);
        (byte < self.buf.len()).then_some((byte, mask))
    }

    pub fn clear(&mut self) {
        self.buf.fill(0);
    }

    pub fn set(&mut self, x: i32, y: i32, on: bool) {
        if let Some((byte, mask)) = self.locate(x, y) {
            if on {
                self.buf[byte] |= mask;
            } else {
                self.buf[byte] &= !mask;
            }
        }
    }

    pub fn get(&self, x: i32, y: i32) -> bool {
        self.locate(x, y)
            .is_some_and(|(byte, mask)| self.buf[byte] & mask != 0)
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, on: bool) {
        for row in y..y + h {
            for col in x..x + w {
                self.set(col, row, on);
            }
        }
    }

    /// One-pixel outline of the rectangle.
    pub fn stroke_rect(&mut self, x: i32, y: i32, w: i32, h: i32) {
        if w <= 0 || h <= 0 {
            return;
        }
        self.fill_rect(x, y, w, 1, true);
        self.fill_rect(x, y + h - 1, w, 1, true);
        self.fill_rect(x, y, 1, h, true);
        self.fill_rect(x + w - 1, y, 1, h, true);
    }
}

/// Reads pixel `(x, y)` from a packed buffer without a mutable borrow.
pub fn pixel(buf: &[u8], resolution: Resolution, x: u8, y: u8) -> bool {
    if x >= resolution.width || y >= resolution.height {
        return false;
    }
    let byte = y as usize * resolution.stride() + x as usize / 8;
    buf.get(byte)
        .is_some_and(|b| b & (1 << (x as usize % 8)) != 0)
}
