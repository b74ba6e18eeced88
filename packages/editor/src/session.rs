//! # Edit Session Management
//!
//! An EditSession is the single entry point for interactive editing. It owns
//! the open document, its command history, the settings, the current
//! selection and clipboard, and notifies subscribers after every change.
//!
//! Every mutation goes through a [`Command`] so it can be undone. Structural
//! rules are checked before a command is recorded; a refused edit leaves
//! both the tree and the history untouched.
//!
//! Detached nodes stay in the arena only while something still refers to
//! them: the history, the clipboard, the selection or a scratch copy that
//! was neither committed nor discarded. Everything else is released after
//! each edit.

use crate::events::{EditorEvent, EventBus};
use crate::preview::{PreviewDispatcher, PreviewSnapshot};
use crate::{Command, Document, EditorError, UndoStack};
use fomod_common::{RealFileSystem, Settings};
use fomod_parser::{NodeId, NodeKind, Tree, TreeError};
use std::path::Path;
use std::sync::mpsc::Receiver;
use tracing::debug;

/// Preview refresh levels of `general.code_refresh`
const REFRESH_MANUAL: u8 = 1;
const REFRESH_ON_SELECT: u8 = 2;
const REFRESH_ON_CHANGE: u8 = 3;

/// Single-user editing session
pub struct EditSession {
    document: Document,
    undo_stack: UndoStack,
    settings: Settings,

    /// Current node
    selection: Option<NodeId>,

    /// Detached copy made by the last [`EditSession::copy`]
    clipboard: Option<NodeId>,

    /// Scratch copies handed out and not yet committed or discarded
    scratch: Vec<NodeId>,

    events: EventBus,
    preview: Option<PreviewDispatcher>,

    /// Incremented on every document change
    revision: u64,
}

impl EditSession {
    /// Start a session on a fresh document
    pub fn new(settings: Settings) -> Self {
        Self::with_document(Document::new(), settings)
    }

    pub fn with_document(document: Document, settings: Settings) -> Self {
        Self {
            document,
            undo_stack: UndoStack::new(),
            settings,
            selection: None,
            clipboard: None,
            scratch: Vec::new(),
            events: EventBus::new(),
            preview: None,
            revision: 0,
        }
    }

    /// Route preview requests to `dispatcher`
    pub fn attach_preview(&mut self, dispatcher: PreviewDispatcher) {
        self.preview = Some(dispatcher);
    }

    pub fn subscribe(&mut self) -> Receiver<EditorEvent> {
        self.events.subscribe()
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn tree(&self) -> &Tree {
        self.document.tree()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn selection(&self) -> Option<NodeId> {
        self.selection
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn undo_stack(&self) -> &UndoStack {
        &self.undo_stack
    }

    /// True if the history moved away from the last saved state
    pub fn is_modified(&self) -> bool {
        !self.undo_stack.is_clean()
    }

    // ------------------------------------------------------------------
    // Document lifecycle
    // ------------------------------------------------------------------

    /// Replace the current document with a fresh one
    pub fn new_document(&mut self) {
        self.replace_document(Document::new());
    }

    /// Open a package; on failure the current document stays active
    pub fn open(&mut self, path: &Path) -> Result<(), EditorError> {
        let document = Document::open(path, &self.settings)?;
        self.replace_document(document);
        self.settings.push_recent(path, &RealFileSystem);
        Ok(())
    }

    pub fn save(&mut self) -> Result<(), EditorError> {
        self.document.save(&self.settings)?;
        self.after_save();
        Ok(())
    }

    pub fn save_as(&mut self, path: &Path) -> Result<(), EditorError> {
        self.document.save_as(path, &self.settings)?;
        self.after_save();
        Ok(())
    }

    fn after_save(&mut self) {
        self.undo_stack.set_clean();
        if let Some(path) = self.document.path().map(Path::to_path_buf) {
            self.settings.push_recent(&path, &RealFileSystem);
        }
        // Saving re-sorts every node.
        self.changed(None);
    }

    fn replace_document(&mut self, document: Document) {
        self.document = document;
        self.undo_stack.clear();
        self.clipboard = None;
        self.scratch.clear();
        self.selection = None;
        self.events.emit(EditorEvent::SelectionChanged(None));
        self.changed(None);
    }

    // ------------------------------------------------------------------
    // Structural edits
    // ------------------------------------------------------------------

    /// Append a new child of `kind` to `parent`, returning it
    pub fn add_child(&mut self, parent: NodeId, kind: NodeKind) -> Result<NodeId, EditorError> {
        self.ensure_attached(parent)?;
        let command = Command::add_child(parent, kind, &self.settings);
        self.execute_creating(command, parent)
    }

    /// Detach `node` from its parent
    pub fn delete(&mut self, node: NodeId) -> Result<(), EditorError> {
        self.ensure_attached(node)?;
        if self.tree().kind(node).is_root() {
            return Err(EditorError::CannotDeleteRoot);
        }
        let parent = self.tree().parent(node).ok_or(EditorError::NotAttached(node))?;

        let mut command = Command::Delete { parent, node };
        command.redo(self.document.tree_mut())?;
        self.record(command, Some(parent));

        if let Some(selected) = self.selection {
            if self.tree().is_ancestor_or_self(node, selected) {
                self.select(Some(parent));
            }
        }
        Ok(())
    }

    /// Put a copy of `node` on the clipboard
    ///
    /// Later edits of `node` do not affect what is pasted.
    pub fn copy(&mut self, node: NodeId) -> Result<(), EditorError> {
        self.ensure_attached(node)?;
        self.clipboard = Some(self.document.tree_mut().copy_subtree(node));
        self.release_garbage();
        Ok(())
    }

    pub fn can_paste(&self, parent: NodeId) -> bool {
        match self.clipboard {
            Some(source) => self.tree().can_add_child(parent, self.tree().kind(source)),
            None => false,
        }
    }

    /// Append a copy of the clipboard to `parent`, returning the copy
    pub fn paste(&mut self, parent: NodeId) -> Result<NodeId, EditorError> {
        let source = self.clipboard.ok_or(EditorError::EmptyClipboard)?;
        self.ensure_attached(parent)?;

        let command = Command::paste(parent, source);
        self.execute_creating(command, parent)
    }

    /// Detached working copy of `node` for guided edits
    ///
    /// Modify it with [`EditSession::modify_scratch`], then commit it with
    /// [`EditSession::replace_subtree`] or drop it with
    /// [`EditSession::discard_scratch`].
    pub fn scratch_copy(&mut self, node: NodeId) -> Result<NodeId, EditorError> {
        self.ensure_attached(node)?;
        let scratch = self.document.tree_mut().copy_subtree(node);
        self.scratch.push(scratch);
        Ok(scratch)
    }

    /// Edit a detached subtree outside the history
    pub fn modify_scratch<F>(&mut self, scratch: NodeId, edit: F) -> Result<(), EditorError>
    where
        F: FnOnce(&mut Tree, NodeId),
    {
        self.ensure_exists(scratch)?;
        if self.is_in_document(scratch) {
            return Err(EditorError::NotDetached(scratch));
        }
        edit(self.document.tree_mut(), scratch);
        Ok(())
    }

    /// Give up a scratch copy without committing it
    pub fn discard_scratch(&mut self, scratch: NodeId) {
        self.scratch.retain(|id| *id != scratch);
        self.release_garbage();
    }

    /// Swap `original` for the detached `modified` subtree
    pub fn replace_subtree(&mut self, original: NodeId, modified: NodeId) -> Result<(), EditorError> {
        self.ensure_attached(original)?;
        self.ensure_exists(modified)?;
        let parent = self.tree().parent(original).ok_or(EditorError::NotAttached(original))?;
        if self.tree().is_attached(modified) {
            return Err(EditorError::NotDetached(modified));
        }

        let mut command = Command::ReplaceSubtree {
            parent,
            original,
            modified,
        };
        command.redo(self.document.tree_mut())?;
        self.scratch.retain(|id| *id != modified);
        self.record(command, Some(parent));

        if self.selection == Some(original) {
            self.select(Some(modified));
        }
        Ok(())
    }

    /// Put the children of `parent` in `order` (e.g. after a drag and drop)
    pub fn reorder(&mut self, parent: NodeId, order: Vec<NodeId>) -> Result<(), EditorError> {
        self.ensure_attached(parent)?;
        let mut command = Command::reorder(self.tree(), parent, order);
        command.redo(self.document.tree_mut())?;
        self.record(command, Some(parent));
        Ok(())
    }

    // ------------------------------------------------------------------
    // Attribute edits
    // ------------------------------------------------------------------

    pub fn set_property(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), EditorError> {
        self.ensure_attached(node)?;
        if self.tree().property(node, name) == Some(value) {
            return Ok(());
        }
        let command = Command::set_property(self.tree(), node, name, Some(value.to_string()));
        self.execute(command)
    }

    pub fn remove_property(&mut self, node: NodeId, name: &str) -> Result<(), EditorError> {
        self.ensure_attached(node)?;
        if self.tree().property(node, name).is_none() {
            return Ok(());
        }
        let command = Command::set_property(self.tree(), node, name, None);
        self.execute(command)
    }

    pub fn set_text(&mut self, node: NodeId, text: &str) -> Result<(), EditorError> {
        self.ensure_attached(node)?;
        if self.tree().text(node) == text {
            return Ok(());
        }
        let command = Command::set_text(self.tree(), node, text);
        self.execute(command)
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    /// Returns false if there was nothing to undo
    pub fn undo(&mut self) -> Result<bool, EditorError> {
        let affected = self.undo_stack.undo(self.document.tree_mut())?;
        self.after_history_step(affected)
    }

    /// Returns false if there was nothing to redo
    pub fn redo(&mut self) -> Result<bool, EditorError> {
        let affected = self.undo_stack.redo(self.document.tree_mut())?;
        self.after_history_step(affected)
    }

    pub fn can_undo(&self) -> bool {
        self.undo_stack.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.undo_stack.can_redo()
    }

    fn after_history_step(&mut self, affected: Option<NodeId>) -> Result<bool, EditorError> {
        let Some(node) = affected else {
            return Ok(false);
        };

        // The selection may have been detached by the step.
        if let Some(selected) = self.selection {
            if !self.is_in_document(selected) {
                self.select(None);
            }
        }
        self.changed(Some(node));
        Ok(true)
    }

    // ------------------------------------------------------------------
    // Selection and preview
    // ------------------------------------------------------------------

    pub fn select(&mut self, node: Option<NodeId>) {
        if self.selection == node {
            return;
        }
        self.selection = node;
        self.events.emit(EditorEvent::SelectionChanged(node));
        if self.settings.general.code_refresh >= REFRESH_ON_SELECT {
            self.request_preview();
        }
    }

    /// Explicit preview refresh
    pub fn refresh(&mut self) {
        if self.settings.general.code_refresh >= REFRESH_MANUAL {
            self.request_preview();
        }
    }

    /// Submit a copy of both documents, leaving detached nodes behind
    fn request_preview(&self) {
        let Some(preview) = &self.preview else {
            return;
        };
        let roots = [self.document.info(), self.document.config()];
        let (tree, ids) = self.tree().extract(&roots);
        let (Some(&info), Some(&config)) = (ids.get(&roots[0]), ids.get(&roots[1])) else {
            return;
        };
        preview.submit(PreviewSnapshot {
            tree,
            info,
            config,
            focus: self.selection.and_then(|node| ids.get(&node).copied()),
            revision: self.revision,
        });
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn execute(&mut self, mut command: Command) -> Result<(), EditorError> {
        let affected = command.redo(self.document.tree_mut())?;
        self.record(command, Some(affected));
        Ok(())
    }

    /// Run an add or paste, returning the node it attached to `parent`
    fn execute_creating(&mut self, mut command: Command, parent: NodeId) -> Result<NodeId, EditorError> {
        command.redo(self.document.tree_mut())?;
        let created = command.created().ok_or(EditorError::NotAttached(parent))?;
        self.record(command, Some(parent));
        Ok(created)
    }

    fn record(&mut self, command: Command, affected: Option<NodeId>) {
        debug!(command = command.description(), "Applied");
        let description = command.description().to_string();
        self.undo_stack.push(command, Some(description));
        self.release_garbage();
        self.changed(affected);
    }

    /// Release arena slots nothing in the session refers to anymore
    fn release_garbage(&mut self) {
        let mut live = vec![self.document.info(), self.document.config()];
        live.extend(self.clipboard);
        live.extend(self.selection);
        live.extend(&self.scratch);
        live.extend(self.undo_stack.referenced_nodes());
        self.document.tree_mut().release_unreachable(&live);
    }

    fn changed(&mut self, node: Option<NodeId>) {
        self.revision += 1;
        self.events.emit(EditorEvent::DocumentChanged(node));
        if self.settings.general.code_refresh >= REFRESH_ON_CHANGE {
            self.request_preview();
        }
    }

    fn is_in_document(&self, node: NodeId) -> bool {
        let root = self.tree().root_of(node);
        root == self.document.info() || root == self.document.config()
    }

    fn ensure_exists(&self, node: NodeId) -> Result<(), EditorError> {
        if self.tree().contains(node) {
            Ok(())
        } else {
            Err(TreeError::NodeNotFound(node.index()).into())
        }
    }

    fn ensure_attached(&self, node: NodeId) -> Result<(), EditorError> {
        if self.tree().contains(node) && self.is_in_document(node) {
            Ok(())
        } else {
            Err(EditorError::NotAttached(node))
        }
    }
}
