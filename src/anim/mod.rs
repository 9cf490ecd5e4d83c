// src/anim/mod.rs
//! Animation generators and the profile table that picks one per display.

pub mod bitmap;
pub mod logo;

use crate::client::{Client, Resolution};
use crate::frame::Frame;
use anyhow::Result;

/// Produces an endless frame sequence for one display.
///
/// Dropping the generator is its destroy operation.
pub trait AnimationGenerator: Send {
    fn resolution(&self) -> Resolution;

    /// Produces the next frame of the sequence.
    fn next_frame(&mut self) -> Result<Frame>;
}

/// Builds a generator for a client whose resolution matched a profile.
pub type GeneratorFactory = fn(&Client) -> Result<Box<dyn AnimationGenerator>>;

/// A resolution the animation source knows how to animate.
#[derive(Clone, Copy)]
pub struct GeneratorProfile {
    pub name: &'static str,
    pub resolution: Resolution,
    pub create: GeneratorFactory,
}

impl std::fmt::Debug for GeneratorProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratorProfile")
            .field("name", &self.name)
            .field("resolution", &self.resolution)
            .finish()
    }
}

fn create_logo(client: &Client) -> Result<Box<dyn AnimationGenerator>> {
    Ok(Box::new(logo::LogoAnimation::new(client)?))
}

/// Known profiles, matched in order.
pub const PROFILES: &[GeneratorProfile] = &[GeneratorProfile {
    name: "logo-128x64",
    resolution: logo::LOGO_RESOLUTION,
    create: create_logo,
}];

/// Finds the profile for `resolution`, if any.
pub fn profile_for(resolution: Resolution) -> Option<&'static GeneratorProfile> {
    PROFILES.iter().find(|p| p.resolution == resolution)
}
