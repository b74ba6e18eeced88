//! # Commands
//!
//! Reversible edits of the node tree, stored as plain data.
//!
//! ## Identity
//!
//! Commands that introduce a node (add child, paste) create it on their first
//! redo and remember its handle. Later redos re-attach that same node, so any
//! command further up the history that refers to it stays valid.
//!
//! Removing a node only detaches it. Its subtree and sort key stay in the
//! arena, and an undo re-attaches it and re-sorts the parent so it lands
//! where it was.

use fomod_common::Settings;
use fomod_parser::{NodeId, NodeKind, SortKey, Tree, TreeError};
use serde::{Deserialize, Serialize};

/// A reversible edit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Command {
    /// Append a new node of `kind` to `parent`
    AddChild {
        parent: NodeId,
        kind: NodeKind,
        /// Property values seeded from the settings
        defaults: Vec<(String, String)>,
        /// Created on first redo
        child: Option<NodeId>,
    },

    /// Detach `node` from `parent`
    Delete { parent: NodeId, node: NodeId },

    /// Append a deep copy of `source` to `parent`
    Paste {
        parent: NodeId,
        source: NodeId,
        /// Created on first redo
        pasted: Option<NodeId>,
    },

    /// Swap an attached subtree for a modified detached copy
    ReplaceSubtree {
        parent: NodeId,
        original: NodeId,
        modified: NodeId,
    },

    /// Put the children of `parent` in `order`
    Reorder {
        parent: NodeId,
        order: Vec<NodeId>,
        previous: Vec<(NodeId, Option<SortKey>)>,
    },

    /// Set (`Some`) or remove (`None`) a property
    SetProperty {
        node: NodeId,
        name: String,
        old: Option<String>,
        new: Option<String>,
    },

    /// Replace the text content of a node
    SetText { node: NodeId, old: String, new: String },
}

impl Command {
    /// Add a child of `kind`, seeding the default property from `settings`
    pub fn add_child(parent: NodeId, kind: NodeKind, settings: &Settings) -> Self {
        let defaults = settings
            .default_for(kind.tag())
            .map(|default| vec![(default.key.clone(), default.value.clone())])
            .unwrap_or_default();

        Command::AddChild {
            parent,
            kind,
            defaults,
            child: None,
        }
    }

    pub fn paste(parent: NodeId, source: NodeId) -> Self {
        Command::Paste {
            parent,
            source,
            pasted: None,
        }
    }

    /// Reorder the children of `parent`, capturing their current order
    pub fn reorder(tree: &Tree, parent: NodeId, order: Vec<NodeId>) -> Self {
        Command::Reorder {
            parent,
            order,
            previous: tree.order_snapshot(parent),
        }
    }

    pub fn set_property(tree: &Tree, node: NodeId, name: &str, value: Option<String>) -> Self {
        Command::SetProperty {
            node,
            name: name.to_string(),
            old: tree.property(node, name).map(str::to_string),
            new: value,
        }
    }

    pub fn set_text(tree: &Tree, node: NodeId, text: impl Into<String>) -> Self {
        Command::SetText {
            node,
            old: tree.text(node).to_string(),
            new: text.into(),
        }
    }

    /// Short label for history listings
    pub fn description(&self) -> &'static str {
        match self {
            Command::AddChild { .. } => "Add child",
            Command::Delete { .. } => "Delete",
            Command::Paste { .. } => "Paste",
            Command::ReplaceSubtree { .. } => "Replace",
            Command::Reorder { .. } => "Reorder",
            Command::SetProperty { .. } => "Set property",
            Command::SetText { .. } => "Set text",
        }
    }

    /// Node introduced by an add or paste that has been applied
    pub fn created(&self) -> Option<NodeId> {
        match self {
            Command::AddChild { child, .. } => *child,
            Command::Paste { pasted, .. } => *pasted,
            _ => None,
        }
    }

    /// Every node the command may touch on a later undo or redo
    pub fn nodes(&self) -> Vec<NodeId> {
        match self {
            Command::AddChild { parent, child, .. } => [Some(*parent), *child].into_iter().flatten().collect(),
            Command::Delete { parent, node } => vec![*parent, *node],
            Command::Paste {
                parent,
                source,
                pasted,
            } => [Some(*parent), Some(*source), *pasted].into_iter().flatten().collect(),
            Command::ReplaceSubtree {
                parent,
                original,
                modified,
            } => vec![*parent, *original, *modified],
            Command::Reorder { parent, order, .. } => {
                let mut nodes = vec![*parent];
                nodes.extend(order);
                nodes
            }
            Command::SetProperty { node, .. } | Command::SetText { node, .. } => vec![*node],
        }
    }

    /// Apply the command, returning the node whose content changed
    pub fn redo(&mut self, tree: &mut Tree) -> Result<NodeId, TreeError> {
        match self {
            Command::AddChild {
                parent,
                kind,
                defaults,
                child,
            } => {
                let id = match *child {
                    Some(id) => id,
                    None => {
                        tree.check_add_child(*parent, *kind)?;
                        let id = tree.create(*kind);
                        for (name, value) in defaults.iter() {
                            tree.set_property(id, name, value.as_str());
                        }
                        *child = Some(id);
                        id
                    }
                };
                tree.add_child(*parent, id)?;
                tree.sort_children(*parent);
                Ok(*parent)
            }

            Command::Delete { parent, node } => {
                tree.remove_child(*parent, *node)?;
                Ok(*parent)
            }

            Command::Paste {
                parent,
                source,
                pasted,
            } => {
                let id = match *pasted {
                    Some(id) => id,
                    None => {
                        tree.check_add_child(*parent, tree.kind(*source))?;
                        let id = tree.copy_subtree(*source);
                        // The copy is appended after the existing children.
                        tree.set_sort_key(id, None);
                        *pasted = Some(id);
                        id
                    }
                };
                tree.add_child(*parent, id)?;
                tree.sort_children(*parent);
                Ok(*parent)
            }

            Command::ReplaceSubtree {
                parent,
                original,
                modified,
            } => {
                swap(tree, *parent, *original, *modified)?;
                Ok(*parent)
            }

            Command::Reorder { parent, order, .. } => {
                tree.reorder(*parent, order)?;
                Ok(*parent)
            }

            Command::SetProperty { node, name, new, .. } => {
                assign_property(tree, *node, name, new.as_deref());
                Ok(*node)
            }

            Command::SetText { node, new, .. } => {
                tree.set_text(*node, new.as_str());
                Ok(*node)
            }
        }
    }

    /// Revert the command, returning the node whose content changed
    pub fn undo(&mut self, tree: &mut Tree) -> Result<NodeId, TreeError> {
        match self {
            Command::AddChild { parent, child, .. } => {
                if let Some(id) = *child {
                    tree.remove_child(*parent, id)?;
                }
                Ok(*parent)
            }

            Command::Delete { parent, node } => {
                tree.add_child(*parent, *node)?;
                tree.sort_children(*parent);
                Ok(*parent)
            }

            Command::Paste { parent, pasted, .. } => {
                if let Some(id) = *pasted {
                    tree.remove_child(*parent, id)?;
                }
                Ok(*parent)
            }

            Command::ReplaceSubtree {
                parent,
                original,
                modified,
            } => {
                swap(tree, *parent, *modified, *original)?;
                Ok(*parent)
            }

            Command::Reorder {
                parent, previous, ..
            } => {
                tree.restore_order(*parent, previous)?;
                Ok(*parent)
            }

            Command::SetProperty { node, name, old, .. } => {
                assign_property(tree, *node, name, old.as_deref());
                Ok(*node)
            }

            Command::SetText { node, old, .. } => {
                tree.set_text(*node, old.as_str());
                Ok(*node)
            }
        }
    }
}

/// Detach `out`, attach `into` and restore sibling order
///
/// If `into` is refused, `out` is put back before the error is returned.
fn swap(tree: &mut Tree, parent: NodeId, out: NodeId, into: NodeId) -> Result<(), TreeError> {
    tree.remove_child(parent, out)?;
    if let Err(err) = tree.add_child(parent, into) {
        tree.add_child(parent, out)?;
        tree.sort_children(parent);
        return Err(err);
    }
    tree.sort_children(parent);
    Ok(())
}

fn assign_property(tree: &mut Tree, node: NodeId, name: &str, value: Option<&str>) {
    match value {
        Some(value) => {
            tree.set_property(node, name, value);
        }
        None => {
            tree.remove_property(node, name);
        }
    }
}
