// src/error.rs
//! Error types for the bootscreen core.
//!
//! Nothing in the core is fatal to the process. These errors tell the caller
//! that an operation had no effect; the offending object has already been
//! released by the time an error is returned.

use crate::client::ClientId;

/// Errors reported by the client [`Registry`](crate::registry::Registry).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// `initialize()` was called on a registry that is already live.
    AlreadyInitialized,
    /// The registry has not been initialized, or was destroyed.
    NotInitialized,
    /// The client descriptor was rejected before any state changed.
    InvalidClient(&'static str),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::AlreadyInitialized => write!(f, "registry already initialized"),
            RegistryError::NotInitialized => write!(f, "registry not initialized"),
            RegistryError::InvalidClient(reason) => write!(f, "invalid client: {}", reason),
        }
    }
}

impl std::error::Error for RegistryError {}

/// Error returned when a command could not be handed to a destination.
///
/// The command is released (its payload freed) before this is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
    /// No destination is registered for the command's target client.
    Unhandled(ClientId),
    /// The dispatcher has been destroyed.
    Stopped,
}

impl std::fmt::Display for DispatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchError::Unhandled(id) => write!(f, "no destination for client {}", id),
            DispatchError::Stopped => write!(f, "dispatcher stopped"),
        }
    }
}

impl std::error::Error for DispatchError {}

/// Errors from writes into an in-memory framebuffer device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramebufferError {
    /// The write offset lies past the end of the framebuffer.
    OffsetOutOfRange { offset: usize, len: usize },
    /// Nothing would be written (empty input, or offset exactly at the end).
    EmptyWrite,
}

impl std::fmt::Display for FramebufferError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FramebufferError::OffsetOutOfRange { offset, len } => {
                write!(f, "offset {} past framebuffer end ({} bytes)", offset, len)
            }
            FramebufferError::EmptyWrite => write!(f, "empty framebuffer write"),
        }
    }
}

impl std::error::Error for FramebufferError {}

/// Returned by operations present in the client contract but not implemented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnsupportedError(pub &'static str);

impl std::fmt::Display for UnsupportedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} is not supported", self.0)
    }
}

impl std::error::Error for UnsupportedError {}
