//! # Undo/Redo Stack
//!
//! Tracks command history and enables undo/redo operations.
//!
//! ## Design
//!
//! - A command is pushed only after it has been applied successfully
//! - Undo reverts the command and moves it to the redo stack
//! - Redo reapplies the same command (same node identities)
//! - New commands clear the redo stack
//! - The oldest entry is dropped once `max_levels` is exceeded
//! - A clean marker remembers the history position of the last save

use crate::Command;
use fomod_parser::{NodeId, Tree, TreeError};
use tracing::debug;

/// Default number of undo levels
pub const DEFAULT_UNDO_LEVELS: usize = 25;

/// A command in the history
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub command: Command,

    /// Optional description of this entry
    pub description: Option<String>,
}

/// Undo/redo stack for document editing
#[derive(Debug)]
pub struct UndoStack {
    /// Applied commands (most recent last)
    undo_stack: Vec<HistoryEntry>,

    /// Undone commands (most recent last)
    redo_stack: Vec<HistoryEntry>,

    /// Maximum number of undo levels (0 = unlimited)
    max_levels: usize,

    /// Undo depth matching the saved state, if still reachable
    clean_index: Option<usize>,
}

impl UndoStack {
    /// Create a new undo stack with default max levels (25)
    pub fn new() -> Self {
        Self::with_max_levels(DEFAULT_UNDO_LEVELS)
    }

    /// Create an undo stack with custom max levels
    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_levels,
            clean_index: Some(0),
        }
    }

    /// Record a command that has already been applied
    pub fn push(&mut self, command: Command, description: Option<String>) {
        // The saved state was undone and is now unreachable.
        if matches!(self.clean_index, Some(index) if index > self.undo_stack.len()) {
            self.clean_index = None;
        }

        self.undo_stack.push(HistoryEntry {
            command,
            description,
        });

        // Trim if exceeded max levels
        if self.max_levels > 0 && self.undo_stack.len() > self.max_levels {
            self.undo_stack.remove(0);
            self.clean_index = self.clean_index.and_then(|index| index.checked_sub(1));
        }

        // Clear redo stack (new action invalidates future)
        self.redo_stack.clear();
    }

    /// Undo the most recent command
    ///
    /// Returns the affected node, or `None` if there was nothing to undo. A
    /// command that fails to revert stays on the undo stack.
    pub fn undo(&mut self, tree: &mut Tree) -> Result<Option<NodeId>, TreeError> {
        let Some(mut entry) = self.undo_stack.pop() else {
            return Ok(None); // Nothing to undo
        };

        match entry.command.undo(tree) {
            Ok(affected) => {
                debug!(command = entry.command.description(), "Undo");
                self.redo_stack.push(entry);
                Ok(Some(affected))
            }
            Err(err) => {
                self.undo_stack.push(entry);
                Err(err)
            }
        }
    }

    /// Redo the most recently undone command
    pub fn redo(&mut self, tree: &mut Tree) -> Result<Option<NodeId>, TreeError> {
        let Some(mut entry) = self.redo_stack.pop() else {
            return Ok(None); // Nothing to redo
        };

        match entry.command.redo(tree) {
            Ok(affected) => {
                debug!(command = entry.command.description(), "Redo");
                self.undo_stack.push(entry);
                Ok(Some(affected))
            }
            Err(err) => {
                self.redo_stack.push(entry);
                Err(err)
            }
        }
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Get the number of undo levels available
    pub fn undo_levels(&self) -> usize {
        self.undo_stack.len()
    }

    /// Get the number of redo levels available
    pub fn redo_levels(&self) -> usize {
        self.redo_stack.len()
    }

    /// Clear all undo/redo history and mark the current state clean
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.clean_index = Some(0);
    }

    /// Mark the current state as saved
    pub fn set_clean(&mut self) {
        self.clean_index = Some(self.undo_stack.len());
    }

    /// True if the history is at the last saved state
    pub fn is_clean(&self) -> bool {
        self.clean_index == Some(self.undo_stack.len())
    }

    /// Nodes referred to by any command still in the history
    pub fn referenced_nodes(&self) -> Vec<NodeId> {
        self.undo_stack
            .iter()
            .chain(&self.redo_stack)
            .flat_map(|entry| entry.command.nodes())
            .collect()
    }

    /// Get description of the next undo operation
    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack
            .last()
            .and_then(|entry| entry.description.as_deref())
    }

    /// Get description of the next redo operation
    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack
            .last()
            .and_then(|entry| entry.description.as_deref())
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new()
    }
}
