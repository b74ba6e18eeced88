use crate::schema::NodeKind;
use thiserror::Error;

pub type ParseResult<T> = Result<T, ParseError>;

/// Malformed serialized input
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Malformed XML at byte {pos}: {message}")]
    Xml { pos: u64, message: String },

    #[error("Unexpected end of document at byte {pos}: <{tag}> is not closed")]
    UnclosedElement { pos: u64, tag: String },

    #[error("Document has no root element")]
    Empty,

    #[error("Unexpected root element: expected <{expected}>, found <{found}>")]
    UnexpectedRoot {
        expected: &'static str,
        found: String,
    },

    #[error("Invalid text encoding: {0}")]
    Encoding(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl ParseError {
    pub fn xml(pos: u64, message: impl Into<String>) -> Self {
        Self::Xml {
            pos,
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for ParseError {
    fn from(e: std::io::Error) -> Self {
        ParseError::Io(e.to_string())
    }
}

/// Why a structural mutation was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    /// The child kind is not in the parent's allowed set
    NotAllowed,
    /// The parent already holds the maximum number of this kind
    InstanceLimit,
    /// Another member of an either-group is already present
    EitherGroupOccupied,
    /// The node is already attached somewhere
    AlreadyAttached,
    /// The node is the parent itself or one of its ancestors
    WouldCreateCycle,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Violation::NotAllowed => "not an allowed child",
            Violation::InstanceLimit => "instance limit reached",
            Violation::EitherGroupOccupied => "either-group already occupied",
            Violation::AlreadyAttached => "node is already attached",
            Violation::WouldCreateCycle => "would create a cycle",
        };
        f.write_str(text)
    }
}

/// Errors from Node Tree mutations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TreeError {
    #[error("Cannot add <{child:?}> to <{parent:?}>: {violation}")]
    StructuralViolation {
        parent: NodeKind,
        child: NodeKind,
        violation: Violation,
    },

    #[error("Node not found: {0}")]
    NodeNotFound(usize),

    #[error("Node {child} is not a child of node {parent}")]
    NotAChild { parent: usize, child: usize },

    #[error("Sequence does not match the current children of node {0}")]
    SequenceMismatch(usize),
}

impl TreeError {
    pub fn violation(parent: NodeKind, child: NodeKind, violation: Violation) -> Self {
        Self::StructuralViolation {
            parent,
            child,
            violation,
        }
    }
}
