// src/config.rs

//! Runtime configuration for the bootscreen host.
//!
//! Settings are read from a JSON file named by the `BOOTSCREEN_CONFIG`
//! environment variable. Every field has a default, so a partial file (or no
//! file at all) is fine.

use crate::source::AnimationTiming;
use anyhow::{ensure, Context, Result};
use log::{info, warn};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable holding the config file path.
pub const CONFIG_ENV: &str = "BOOTSCREEN_CONFIG";

/// Process-wide configuration, loaded on first access.
pub static CONFIG: Lazy<Config> = Lazy::new(Config::load_or_default);

/// Root of the configuration file.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub animation: AnimationConfig,
    pub console: ConsoleConfig,
    pub control: ControlConfig,
    pub framebuffer: FramebufferConfig,
}

// --- Animation ---

/// Cadence of the boot animation and its fade-out.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnimationConfig {
    /// Delay between animation frames.
    pub frame_interval_ms: u64,
    /// Delay between contrast levels of the fade-out.
    pub fade_interval_ms: u64,
    pub fade_start: u8,
    /// Contrast decrement per fade level. Must not be 0.
    pub fade_step: u8,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        AnimationConfig {
            frame_interval_ms: 200,
            fade_interval_ms: 100,
            fade_start: 100,
            fade_step: 10,
        }
    }
}

impl From<&AnimationConfig> for AnimationTiming {
    fn from(config: &AnimationConfig) -> Self {
        AnimationTiming {
            frame_interval: Duration::from_millis(config.frame_interval_ms),
            fade_interval: Duration::from_millis(config.fade_interval_ms),
            fade_start: config.fade_start,
            fade_step: config.fade_step,
        }
    }
}

// --- Host displays ---

/// Which stand-in displays the binary registers at startup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Render frames to the terminal.
    pub enabled: bool,
    pub width: u8,
    pub height: u8,
    /// Extra displays that only count frames.
    pub headless: Vec<DisplaySize>,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        ConsoleConfig {
            enabled: true,
            width: 128,
            height: 64,
            headless: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DisplaySize {
    pub width: u8,
    pub height: u8,
}

// --- Control trigger ---

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct ControlConfig {
    /// Switch to the framebuffer this long after load, without waiting for
    /// SIGUSR1. `None` waits for the signal.
    pub auto_finalize_ms: Option<u64>,
}

// --- Framebuffer ---

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct FramebufferConfig {
    /// File streamed into the first framebuffer after the switch, one frame
    /// per chunk.
    pub mirror_input: Option<PathBuf>,
    /// Delay between mirrored frames.
    pub mirror_interval_ms: Option<u64>,
}

impl Config {
    /// Reads and validates a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Config = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads from `BOOTSCREEN_CONFIG`, falling back to defaults when it is
    /// unset or the file is unusable.
    pub fn load_or_default() -> Self {
        let Some(path) = std::env::var_os(CONFIG_ENV) else {
            return Config::default();
        };
        let path = PathBuf::from(path);
        match Config::load(&path) {
            Ok(config) => {
                info!("Config: loaded {}", path.display());
                config
            }
            Err(e) => {
                warn!("Config: {:#}; using defaults", e);
                Config::default()
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        let anim = &self.animation;
        ensure!(anim.frame_interval_ms > 0, "animation.frame_interval_ms must be positive");
        ensure!(anim.fade_interval_ms > 0, "animation.fade_interval_ms must be positive");
        ensure!(anim.fade_step > 0, "animation.fade_step must be positive");
        ensure!(
            self.console.width > 0 && self.console.height > 0,
            "console dimensions must be positive"
        );
        ensure!(
            self.console.headless.iter().all(|d| d.width > 0 && d.height > 0),
            "headless display dimensions must be positive"
        );
        ensure!(
            self.framebuffer.mirror_interval_ms != Some(0),
            "framebuffer.mirror_interval_ms must be positive"
        );
        Ok(())
    }

    pub fn timing(&self) -> AnimationTiming {
        AnimationTiming::from(&self.animation)
    }
}
