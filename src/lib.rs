// src/lib.rs
//! Bootscreen display pipeline.
//!
//! Small monochrome panels attach to a [`registry::Registry`]; producers
//! ([`source`]) turn animations or framebuffer writes into
//! [`command::Command`]s; the [`dispatch::Dispatcher`] runs one worker per
//! panel and keeps only the newest command of each kind, so a slow panel
//! never builds a backlog.

pub mod anim;
pub mod app;
pub mod client;
pub mod command;
pub mod config;
pub mod control;
pub mod devices;
pub mod dispatch;
pub mod error;
pub mod frame;
pub mod registry;
pub mod source;
pub mod worker;

pub use app::Bootscreen;
pub use client::{Client, ClientId, DisplayDevice, Resolution};
pub use command::{Command, CommandKind, CommandSink};
pub use error::{DispatchError, FramebufferError, RegistryError, UnsupportedError};
pub use frame::{Frame, FramePool};
