// src/devices/console.rs

//! Terminal display: draws 1bpp frames with half-block characters, two pixel
//! rows per text line.

use crate::anim::bitmap::pixel;
use crate::client::{DisplayDevice, Resolution};
use crate::worker::lock;
use log::{debug, warn};
use std::io::{self, Write};
use std::sync::Mutex;

const CURSOR_HIDE: &str = "\x1b[?25l";
const CURSOR_SHOW: &str = "\x1b[?25h";
const CURSOR_HOME: &str = "\x1b[H";
const CLEAR_SCREEN_AND_HOME: &str = "\x1b[2J\x1b[H";

const FULL: char = '█';
const UPPER: char = '▀';
const LOWER: char = '▄';

struct ConsoleState<W> {
    out: W,
    contrast: u8,
    started: bool,
}

pub struct ConsoleDisplay<W: Write + Send = io::Stdout> {
    name: String,
    resolution: Resolution,
    state: Mutex<ConsoleState<W>>,
}

impl ConsoleDisplay<io::Stdout> {
    pub fn stdout(resolution: Resolution) -> Self {
        Self::new("console", resolution, io::stdout())
    }
}

impl<W: Write + Send> ConsoleDisplay<W> {
    pub fn new(name: impl Into<String>, resolution: Resolution, out: W) -> Self {
        Self {
            name: name.into(),
            resolution,
            state: Mutex::new(ConsoleState {
                out,
                contrast: u8::MAX,
                started: false,
            }),
        }
    }

    /// Renders `data` as text: one line per pixel row pair, then a status line.
    pub fn render(&self, data: &[u8], contrast: u8) -> String {
        let res = self.resolution;
        let mut text = String::with_capacity((res.width as usize + 1) * (res.height as usize / 2 + 2));
        for y in (0..res.height).step_by(2) {
            for x in 0..res.width {
                let top = pixel(data, res, x, y);
                let bottom = y + 1 < res.height && pixel(data, res, x, y + 1);
                text.push(match (top, bottom) {
                    (true, true) => FULL,
                    (true, false) => UPPER,
                    (false, true) => LOWER,
                    (false, false) => ' ',
                });
            }
            text.push('\n');
        }
        text.push_str(&format!("{} {} contrast {:>3}\n", self.name, res, contrast));
        text
    }

    fn draw(state: &mut ConsoleState<W>, text: &str) -> io::Result<()> {
        if !state.started {
            write!(state.out, "{}{}", CURSOR_HIDE, CLEAR_SCREEN_AND_HOME)?;
            state.started = true;
        }
        write!(state.out, "{}{}", CURSOR_HOME, text)?;
        state.out.flush()
    }
}

impl<W: Write + Send> DisplayDevice for ConsoleDisplay<W> {
    fn name(&self) -> &str {
        &self.name
    }

    fn resolution(&self) -> Resolution {
        self.resolution
    }

    fn display(&self, data: &[u8]) {
        let mut state = lock(&self.state);
        let text = self.render(data, state.contrast);
        if let Err(e) = Self::draw(&mut state, &text) {
            warn!("ConsoleDisplay: write failed: {}", e);
        }
    }

    fn set_contrast(&self, level: u8) {
        debug!("ConsoleDisplay: {} contrast {}", self.name, level);
        lock(&self.state).contrast = level;
    }
}

impl<W: Write + Send> Drop for ConsoleDisplay<W> {
    fn drop(&mut self) {
        let state = match self.state.get_mut() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        if state.started {
            let _ = write!(state.out, "{}", CURSOR_SHOW);
            let _ = state.out.flush();
        }
    }
}
