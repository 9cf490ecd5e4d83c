// src/dispatch/slots.rs
//! Fixed-size pending-command table, one slot per command kind.

use crate::command::{Command, CommandKind};

/// Holds at most one pending command per [`CommandKind`].
///
/// Inserting a command of a kind that is already pending supersedes the older
/// one: it is handed back to the caller to be released, never executed.
#[derive(Debug, Default)]
pub struct SlotTable {
    slots: [Option<Command>; CommandKind::COUNT],
}

impl SlotTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `command` in its kind's slot and returns the command it
    /// replaced, if any.
    pub fn insert(&mut self, command: Command) -> Option<Command> {
        let slot = &mut self.slots[command.kind().index()];
        slot.replace(command)
    }

    pub fn get(&self, kind: CommandKind) -> Option<&Command> {
        self.slots[kind.index()].as_ref()
    }

    /// Moves every pending command out, leaving this table empty.
    pub fn take(&mut self) -> SlotTable {
        std::mem::take(self)
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// Pending commands in kind order (Display before SetContrast).
    pub fn into_commands(self) -> impl Iterator<Item = Command> {
        self.slots.into_iter().flatten()
    }

    /// Releases every pending command without executing it. Returns how many
    /// were released.
    pub fn release_all(self) -> usize {
        let mut released = 0;
        for command in self.into_commands() {
            command.release();
            released += 1;
        }
        released
    }
}
