// src/anim/logo.rs
//! Boot logo animation for 128x64 panels.
//!
//! Each frame draws a border, a fixed logo block, a dot orbiting to the right
//! of the logo and a progress bar that fills and wraps. The sequence is fully
//! determined by the frame counter.

use super::bitmap::Bitmap;
use super::AnimationGenerator;
use crate::client::{Client, Resolution};
use crate::frame::{Frame, FramePool};
use anyhow::{ensure, Result};
use log::debug;

pub const LOGO_RESOLUTION: Resolution = Resolution::new(128, 64);

const SPINNER_CENTER: (i32, i32) = (100, 22);
const SPINNER_PHASES: [(i32, i32); 8] = [
    (8, 0),
    (6, 6),
    (0, 8),
    (-6, 6),
    (-8, 0),
    (-6, -6),
    (0, -8),
    (6, -6),
];

const BAR_X: i32 = 16;
const BAR_Y: i32 = 46;
const BAR_W: i32 = 96;
const BAR_H: i32 = 10;
/// Fill positions per progress cycle, including the empty bar.
pub const BAR_STEPS: u32 = 17;

/// Frames before the whole animation repeats.
pub const PERIOD: u32 = SPINNER_PHASES.len() as u32 * BAR_STEPS;

/// Logo generator for a single 128x64 client.
pub struct LogoAnimation {
    name: String,
    tick: u32,
    pool: FramePool,
}

impl LogoAnimation {
    pub fn new(client: &Client) -> Result<Self> {
        ensure!(
            client.resolution() == LOGO_RESOLUTION,
            "logo animation needs {}, {} is {}",
            LOGO_RESOLUTION,
            client.name(),
            client.resolution()
        );
        debug!("LogoAnimation: created for {}", client);
        Ok(Self {
            name: client.name().to_string(),
            tick: 0,
            pool: FramePool::new(LOGO_RESOLUTION.frame_len()),
        })
    }

    pub fn tick(&self) -> u32 {
        self.tick
    }

    fn draw(tick: u32, buf: &mut [u8]) {
        let mut bitmap = Bitmap::new(buf, LOGO_RESOLUTION);

        bitmap.stroke_rect(0, 0, 128, 64);

        // Logo: a panel glyph, solid frame with a hollow screen.
        bitmap.fill_rect(44, 10, 36, 24, true);
        bitmap.fill_rect(48, 14, 28, 16, false);
        bitmap.fill_rect(58, 34, 8, 4, true);

        let (dx, dy) = SPINNER_PHASES[(tick as usize) % SPINNER_PHASES.len()];
        let (cx, cy) = SPINNER_CENTER;
        bitmap.fill_rect(cx + dx - 1, cy + dy - 1, 3, 3, true);

        bitmap.stroke_rect(BAR_X, BAR_Y, BAR_W, BAR_H);
        let step = (tick % BAR_STEPS) as i32;
        let inner = BAR_W - 2;
        let filled = inner * step / (BAR_STEPS as i32 - 1);
        bitmap.fill_rect(BAR_X + 1, BAR_Y + 1, filled, BAR_H - 2, true);
    }
}

impl AnimationGenerator for LogoAnimation {
    fn resolution(&self) -> Resolution {
        LOGO_RESOLUTION
    }

    fn next_frame(&mut self) -> Result<Frame> {
        let tick = self.tick;
        self.tick = self.tick.wrapping_add(1) % PERIOD;
        Ok(self.pool.frame(|buf| Self::draw(tick, buf)))
    }
}

impl Drop for LogoAnimation {
    fn drop(&mut self) {
        debug!("LogoAnimation: destroyed for {}", self.name);
    }
}
