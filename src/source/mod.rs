// src/source/mod.rs
//! Producers: components that generate display commands.
//!
//! Every producer follows the same lifecycle:
//!
//! ```text
//! new() ──► start() ──► finalize() ──► destroy()
//! ```
//!
//! `finalize` is optional. `destroy` consumes the producer, so it runs exactly
//! once and nothing can be called afterwards.

pub mod animation;
pub mod framebuffer;

pub use animation::{fade_levels, AnimationSource, AnimationState, AnimationTiming};
pub use framebuffer::{FramebufferDevice, FramebufferSource};

use anyhow::Result;

/// Uniform lifecycle over producer implementations.
pub trait Source: Send {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Begins producing. Calling it again while running has no effect.
    fn start(&self) -> Result<()>;

    /// Winds production down. Must come before `destroy` if used at all.
    fn finalize(&self) -> Result<()>;

    /// Stops all workers and releases everything the producer owns.
    fn destroy(self: Box<Self>);
}
