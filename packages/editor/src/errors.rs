//! Error types for the editor

use fomod_linter::Diagnostic;
use fomod_parser::NodeId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Parse error: {0}")]
    Parse(#[from] fomod_parser::ParseError),

    #[error("Structural violation: {0}")]
    Tree(#[from] fomod_parser::TreeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings error: {0}")]
    Settings(#[from] fomod_common::CommonError),

    #[error("Schema validation failed with {} error(s)", .0.len())]
    SchemaValidation(Vec<Diagnostic>),

    #[error("{} referenced resource(s) are missing", .0.len())]
    MissingResources(Vec<Diagnostic>),

    #[error("Document has no package path")]
    NotFileBacked,

    #[error("Document roots cannot be deleted")]
    CannotDeleteRoot,

    #[error("Node {0} is not attached to a document")]
    NotAttached(NodeId),

    #[error("Node {0} is still attached to a document")]
    NotDetached(NodeId),

    #[error("Clipboard is empty")]
    EmptyClipboard,
}
