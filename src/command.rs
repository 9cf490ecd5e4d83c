// src/command.rs
//! Display commands: the closed set of operations a producer can ask a
//! destination to perform.
//!
//! A command owns its payload. It is consumed either by [`Command::execute`]
//! (apply, then release) or by [`Command::release`] (release only), so the
//! payload is freed exactly once whichever path it takes.

use crate::client::{Client, ClientId};
use crate::error::DispatchError;
use crate::frame::Frame;
use log::trace;

/// Discriminant used to coalesce commands: one pending slot per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CommandKind {
    Display,
    SetContrast,
}

impl CommandKind {
    /// Number of kinds, and the size of a destination's slot table.
    pub const COUNT: usize = 2;

    /// All kinds, in the order a drain executes them.
    pub const ALL: [CommandKind; CommandKind::COUNT] =
        [CommandKind::Display, CommandKind::SetContrast];

    pub fn index(self) -> usize {
        match self {
            CommandKind::Display => 0,
            CommandKind::SetContrast => 1,
        }
    }
}

/// An executable, self-releasing display operation.
#[derive(Debug)]
pub enum Command {
    /// Show a frame on the client.
    Display { client: Client, frame: Frame },
    /// Change the client's contrast.
    SetContrast { client: Client, level: u8 },
}

impl Command {
    pub fn display(client: &Client, frame: Frame) -> Self {
        Command::Display {
            client: client.clone(),
            frame,
        }
    }

    pub fn set_contrast(client: &Client, level: u8) -> Self {
        Command::SetContrast {
            client: client.clone(),
            level,
        }
    }

    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Display { .. } => CommandKind::Display,
            Command::SetContrast { .. } => CommandKind::SetContrast,
        }
    }

    pub fn client(&self) -> &Client {
        match self {
            Command::Display { client, .. } | Command::SetContrast { client, .. } => client,
        }
    }

    pub fn target(&self) -> ClientId {
        self.client().id()
    }

    /// Applies the command to its client, then releases it.
    pub fn execute(self) {
        match &self {
            Command::Display { client, frame } => {
                trace!("Command: display {} bytes on {}", frame.len(), client);
                client.display(frame.as_bytes());
            }
            Command::SetContrast { client, level } => {
                trace!("Command: contrast {} on {}", level, client);
                client.set_contrast(*level);
            }
        }
        self.release();
    }

    /// Releases the payload without applying it.
    pub fn release(self) {
        drop(self);
    }
}

/// Anything that accepts commands on behalf of attached displays.
///
/// On error the command has already been released.
pub trait CommandSink: Send + Sync {
    fn submit(&self, command: Command) -> Result<(), DispatchError>;
}
