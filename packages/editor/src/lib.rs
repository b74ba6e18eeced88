//! # FOMOD Editor
//!
//! Core document editing engine for installer packages.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ parser: fomod/*.xml → node tree             │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: Document lifecycle + commands       │
//! │  - Open/save packages with checks           │
//! │  - Apply commands with structural rules     │
//! │  - Undo/redo history                        │
//! │  - Notify views, dispatch previews          │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ preview worker: snapshot → rendered output  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Tree is source of truth**: previews are derived from snapshots
//! 2. **Every edit is a command**: nothing touches the tree outside the history
//! 3. **Refuse early**: an invalid edit never reaches the tree
//!
//! ## Usage
//!
//! ```rust,ignore
//! use fomod_common::Settings;
//! use fomod_editor::EditSession;
//! use fomod_parser::NodeKind;
//!
//! let mut session = EditSession::new(Settings::default());
//! let config = session.document().config();
//! let steps = session.add_child(config, NodeKind::InstallSteps)?;
//! session.undo()?;
//! session.save_as(Path::new("MyMod"))?;
//! ```

mod commands;
mod document;
mod errors;
mod events;
mod preview;
mod session;
mod undo_stack;

pub use commands::Command;
pub use document::Document;
pub use errors::EditorError;
pub use events::{EditorEvent, EventBus};
pub use preview::{CodePreview, CodePreviewOutput, PreviewDispatcher, PreviewRenderer, PreviewSnapshot};
pub use session::EditSession;
pub use undo_stack::{HistoryEntry, UndoStack, DEFAULT_UNDO_LEVELS};
