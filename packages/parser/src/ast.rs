//! # Node Tree
//!
//! Arena of typed nodes addressed by [`NodeId`] handles. A node's `parent`
//! is a handle, not an owner, so upward navigation is O(1) without
//! reference cycles.
//!
//! Detached nodes stay in the arena. Removing a child keeps its subtree
//! intact so that an undo can re-attach the very same node. Nodes nobody
//! refers to anymore are handed back with [`Tree::release_unreachable`] and
//! their slots are reused by later nodes.
//!
//! Sibling order is tracked by a persisted [`SortKey`]. The children vector
//! is kept in display order and keys increase along it.

use crate::error::{TreeError, Violation};
use crate::schema::{NodeKind, TypeDescriptor};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// Stable handle of a node inside a [`Tree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Persisted user ordering of a node among its siblings
///
/// Serialized as a zero-padded seven digit decimal string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SortKey(u32);

impl SortKey {
    pub const WIDTH: usize = 7;
    pub const MAX: u32 = 9_999_999;

    pub fn new(value: u32) -> Option<Self> {
        (value <= Self::MAX).then_some(Self(value))
    }

    pub fn value(self) -> u32 {
        self.0
    }

    /// Parse a persisted key; anything but up to seven ASCII digits is rejected
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() || raw.len() > Self::WIDTH || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        raw.parse().ok().and_then(Self::new)
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0width$}", self.0, width = Self::WIDTH)
    }
}

/// A named attribute value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub name: String,
    pub value: String,
}

/// A typed element of the metadata or configuration document
#[derive(Debug, Clone)]
pub struct Node {
    kind: NodeKind,
    tag: String,
    properties: Vec<Property>,
    text: String,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
    sort_key: Option<SortKey>,
    dirty: bool,
    released: bool,
}

impl Node {
    fn new(kind: NodeKind, tag: String) -> Self {
        Self {
            kind,
            tag,
            properties: Vec::new(),
            text: String::new(),
            children: Vec::new(),
            parent: None,
            sort_key: None,
            dirty: false,
            released: false,
        }
    }

    /// Empty placeholder left in a released slot
    fn vacant(kind: NodeKind) -> Self {
        Self {
            released: true,
            ..Self::new(kind, String::new())
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn descriptor(&self) -> &'static TypeDescriptor {
        self.kind.descriptor()
    }

    /// Tag as it appears in the document
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Properties in insertion (document) order
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value.as_str())
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn sort_key(&self) -> Option<SortKey> {
        self.sort_key
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

/// A group rule currently broken by a node's children
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupViolation {
    /// None of the at-least-one group members is present
    AtLeastOneMissing(&'static [NodeKind]),
    /// No member of the either-group is present
    EitherMissing(&'static [NodeKind]),
    /// More than one member of the either-group is present
    EitherConflict(&'static [NodeKind]),
}

/// Arena holding one or more independently rooted documents
#[derive(Debug, Clone, Default)]
pub struct Tree {
    nodes: Vec<Node>,

    /// Released slots, reused by the next nodes created
    free: Vec<NodeId>,
}

impl Tree {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Number of live nodes in this arena, attached or not
    pub fn len(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn allocate(&mut self, node: Node) -> NodeId {
        match self.free.pop() {
            Some(id) => {
                self.nodes[id.index()] = node;
                id
            }
            None => {
                let id = NodeId(self.nodes.len() as u32);
                self.nodes.push(node);
                id
            }
        }
    }

    /// Create a detached node with the default values of its properties
    pub fn create(&mut self, kind: NodeKind) -> NodeId {
        let id = self.create_element(kind.tag(), kind);
        let node = &mut self.nodes[id.index()];
        for def in kind.descriptor().properties {
            if let Some(default) = def.default {
                node.properties.push(Property {
                    name: def.name.to_string(),
                    value: default.to_string(),
                });
            }
        }
        id
    }

    /// Create a detached node without default properties
    pub fn create_element(&mut self, tag: &str, kind: NodeKind) -> NodeId {
        self.allocate(Node::new(kind, tag.to_string()))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index()).filter(|node| !node.released)
    }

    /// # Panics
    ///
    /// Panics if `id` was not created by this tree.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    fn ensure(&self, id: NodeId) -> Result<(), TreeError> {
        if self.contains(id) {
            Ok(())
        } else {
            Err(TreeError::NodeNotFound(id.index()))
        }
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.node(id).kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn text(&self, id: NodeId) -> &str {
        &self.node(id).text
    }

    pub fn property(&self, id: NodeId, name: &str) -> Option<&str> {
        self.node(id).property(name)
    }

    pub fn sort_key(&self, id: NodeId) -> Option<SortKey> {
        self.node(id).sort_key
    }

    pub fn is_attached(&self, id: NodeId) -> bool {
        self.node(id).parent.is_some()
    }

    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |current| self.parent(*current))
    }

    pub fn root_of(&self, id: NodeId) -> NodeId {
        self.ancestors(id).last().unwrap_or(id)
    }

    /// True if `ancestor` is `id` or one of its ancestors
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, id: NodeId) -> bool {
        ancestor == id || self.ancestors(id).any(|a| a == ancestor)
    }

    /// Pre-order traversal of a subtree, including its root
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            result.push(current);
            stack.extend(self.children(current).iter().rev());
        }
        result
    }

    // ------------------------------------------------------------------
    // Structural queries
    // ------------------------------------------------------------------

    pub fn allowed_children(&self, parent: NodeId) -> &'static [NodeKind] {
        self.node(parent).descriptor().allowed_children
    }

    pub fn required_children(&self, parent: NodeId) -> &'static [NodeKind] {
        self.node(parent).descriptor().required_children
    }

    pub fn count_children(&self, parent: NodeId, kind: NodeKind) -> usize {
        self.children(parent)
            .iter()
            .filter(|child| self.kind(**child) == kind)
            .count()
    }

    /// Check whether a child of `kind` could be appended to `parent`
    pub fn check_add_child(&self, parent: NodeId, kind: NodeKind) -> Result<(), TreeError> {
        self.ensure(parent)?;
        let parent_kind = self.kind(parent);
        let descriptor = parent_kind.descriptor();

        if !descriptor.allows(kind) {
            return Err(TreeError::violation(parent_kind, kind, Violation::NotAllowed));
        }

        if let Some(max) = descriptor.max_instances(kind) {
            if self.count_children(parent, kind) + 1 > max {
                return Err(TreeError::violation(parent_kind, kind, Violation::InstanceLimit));
            }
        }

        // Either-groups are exactly-one-of, so any present member blocks
        // another member, including a second instance of the same kind.
        if let Some(group) = descriptor.either_group_of(kind) {
            let occupied = self
                .children(parent)
                .iter()
                .any(|child| group.contains(&self.kind(*child)));
            if occupied {
                return Err(TreeError::violation(
                    parent_kind,
                    kind,
                    Violation::EitherGroupOccupied,
                ));
            }
        }

        Ok(())
    }

    pub fn can_add_child(&self, parent: NodeId, kind: NodeKind) -> bool {
        self.check_add_child(parent, kind).is_ok()
    }

    /// Allowed child kinds that can be added right now
    pub fn addable_children(&self, parent: NodeId) -> Vec<NodeKind> {
        self.allowed_children(parent)
            .iter()
            .copied()
            .filter(|kind| self.can_add_child(parent, *kind))
            .collect()
    }

    pub fn missing_required_children(&self, parent: NodeId) -> Vec<NodeKind> {
        self.required_children(parent)
            .iter()
            .copied()
            .filter(|kind| self.count_children(parent, *kind) == 0)
            .collect()
    }

    pub fn unsatisfied_groups(&self, parent: NodeId) -> Vec<GroupViolation> {
        let descriptor = self.node(parent).descriptor();
        let present = |group: &[NodeKind]| {
            self.children(parent)
                .iter()
                .filter(|child| group.contains(&self.kind(**child)))
                .count()
        };

        let mut violations = Vec::new();
        for group in descriptor.at_least_one_groups {
            if present(group) == 0 {
                violations.push(GroupViolation::AtLeastOneMissing(group));
            }
        }
        for group in descriptor.either_groups {
            match present(group) {
                0 => violations.push(GroupViolation::EitherMissing(group)),
                1 => {}
                _ => violations.push(GroupViolation::EitherConflict(group)),
            }
        }
        violations
    }

    // ------------------------------------------------------------------
    // Structural mutations
    // ------------------------------------------------------------------

    /// Append a detached node to `parent`
    ///
    /// A node without a key (or whose key collides with a sibling's) gets
    /// the next key after the largest sibling key. A node that already
    /// carries a unique key keeps it, so callers re-attaching a removed node
    /// can restore its position with [`Tree::sort_children`].
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.check_attach(parent, child)?;

        let collides = match self.sort_key(child) {
            Some(key) => self
                .children(parent)
                .iter()
                .any(|sibling| self.sort_key(*sibling) == Some(key)),
            None => true,
        };
        if collides {
            let key = self.next_sort_key(parent);
            self.node_mut(child).sort_key = Some(key);
        }

        self.link(parent, child);
        Ok(())
    }

    /// Append a detached node as-is, leaving its key untouched
    ///
    /// Used while importing, where keys are normalized once all siblings
    /// have been read.
    pub(crate) fn admit_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.check_attach(parent, child)?;
        self.link(parent, child);
        Ok(())
    }

    fn check_attach(&self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.ensure(parent)?;
        self.ensure(child)?;

        let parent_kind = self.kind(parent);
        let child_kind = self.kind(child);

        if self.is_attached(child) {
            return Err(TreeError::violation(parent_kind, child_kind, Violation::AlreadyAttached));
        }
        if self.is_ancestor_or_self(child, parent) {
            return Err(TreeError::violation(parent_kind, child_kind, Violation::WouldCreateCycle));
        }
        self.check_add_child(parent, child_kind)
    }

    fn link(&mut self, parent: NodeId, child: NodeId) {
        self.node_mut(parent).children.push(child);
        self.node_mut(child).parent = Some(parent);
        self.mark_dirty(parent);
    }

    /// Detach `child` from `parent`, keeping its subtree and key intact
    ///
    /// Surviving siblings keep their keys.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.ensure(parent)?;
        self.ensure(child)?;

        let position = self
            .children(parent)
            .iter()
            .position(|c| *c == child)
            .ok_or(TreeError::NotAChild {
                parent: parent.index(),
                child: child.index(),
            })?;

        self.node_mut(parent).children.remove(position);
        self.node_mut(child).parent = None;
        self.mark_dirty(parent);
        Ok(())
    }

    /// Deep value copy with fresh identities and no parent linkage
    ///
    /// Keys, properties and text are copied as-is.
    pub fn copy_subtree(&mut self, id: NodeId) -> NodeId {
        let source = self.node(id);
        let mut copy = Node::new(source.kind, source.tag.clone());
        copy.properties = source.properties.clone();
        copy.text = source.text.clone();
        copy.sort_key = source.sort_key;
        let children = source.children.clone();

        let copy_id = self.allocate(copy);

        for child in children {
            let child_copy = self.copy_subtree(child);
            self.node_mut(child_copy).parent = Some(copy_id);
            self.node_mut(copy_id).children.push(child_copy);
        }

        copy_id
    }

    /// Copy a subtree of another tree into this arena
    pub fn import_subtree(&mut self, source: &Tree, id: NodeId) -> NodeId {
        self.import_mapped(source, id, &mut HashMap::new())
    }

    /// Copy the trees under `roots` into a fresh arena holding nothing else
    ///
    /// The map gives the new handle of every copied node, keyed by its
    /// handle in `self`.
    pub fn extract(&self, roots: &[NodeId]) -> (Tree, HashMap<NodeId, NodeId>) {
        let mut tree = Tree::new();
        let mut ids = HashMap::new();
        for root in roots {
            tree.import_mapped(self, *root, &mut ids);
        }
        (tree, ids)
    }

    fn import_mapped(&mut self, source: &Tree, id: NodeId, ids: &mut HashMap<NodeId, NodeId>) -> NodeId {
        let node = source.node(id);
        let copy_id = self.create_element(&node.tag, node.kind);
        ids.insert(id, copy_id);
        {
            let copy = self.node_mut(copy_id);
            copy.properties = node.properties.clone();
            copy.text = node.text.clone();
            copy.sort_key = node.sort_key;
        }
        for child in node.children.clone() {
            let child_copy = self.import_mapped(source, child, ids);
            self.node_mut(child_copy).parent = Some(copy_id);
            self.node_mut(copy_id).children.push(child_copy);
        }
        copy_id
    }

    /// Release every node outside the trees that hold a `live` node
    ///
    /// The whole tree around each live node survives, up to its root.
    /// Released handles no longer resolve and their slots are handed out
    /// again by later creations. Returns how many nodes were released.
    pub fn release_unreachable(&mut self, live: &[NodeId]) -> usize {
        let mut keep = vec![false; self.nodes.len()];
        for id in live.iter().filter(|id| self.contains(**id)) {
            for node in self.descendants(self.root_of(*id)) {
                keep[node.index()] = true;
            }
        }

        let mut released = 0;
        for (index, kept) in keep.into_iter().enumerate() {
            let node = &mut self.nodes[index];
            if kept || node.released {
                continue;
            }
            *node = Node::vacant(node.kind);
            self.free.push(NodeId(index as u32));
            released += 1;
        }

        if released > 0 {
            debug!(released, live = self.len(), "Released unreachable nodes");
        }
        released
    }

    /// Put the children of `parent` in `sequence` order and assign keys
    ///
    /// Siblings already in increasing key order along the new sequence keep
    /// their keys; only the others are renumbered. When the gaps between
    /// kept keys are too small, every sibling is renumbered from 1.
    pub fn reorder(&mut self, parent: NodeId, sequence: &[NodeId]) -> Result<(), TreeError> {
        self.ensure(parent)?;
        self.check_permutation(parent, sequence)?;

        let current: Vec<Option<SortKey>> = sequence.iter().map(|id| self.sort_key(*id)).collect();
        let planned = plan_sort_keys(&current);

        let changed = self.children(parent) != sequence
            || current.iter().zip(&planned).any(|(old, new)| *old != Some(*new));

        for (id, key) in sequence.iter().zip(planned) {
            self.node_mut(*id).sort_key = Some(key);
        }
        self.node_mut(parent).children = sequence.to_vec();

        if changed {
            self.mark_dirty(parent);
        }
        Ok(())
    }

    /// Restore an order previously captured with [`Tree::order_snapshot`]
    pub fn restore_order(
        &mut self,
        parent: NodeId,
        snapshot: &[(NodeId, Option<SortKey>)],
    ) -> Result<(), TreeError> {
        self.ensure(parent)?;
        let sequence: Vec<NodeId> = snapshot.iter().map(|(id, _)| *id).collect();
        self.check_permutation(parent, &sequence)?;

        for (id, key) in snapshot {
            self.node_mut(*id).sort_key = *key;
        }
        self.node_mut(parent).children = sequence;
        self.mark_dirty(parent);
        Ok(())
    }

    /// Children of `parent` with their current keys
    pub fn order_snapshot(&self, parent: NodeId) -> Vec<(NodeId, Option<SortKey>)> {
        self.children(parent)
            .iter()
            .map(|id| (*id, self.sort_key(*id)))
            .collect()
    }

    fn check_permutation(&self, parent: NodeId, sequence: &[NodeId]) -> Result<(), TreeError> {
        let mut expected = self.children(parent).to_vec();
        let mut given = sequence.to_vec();
        expected.sort();
        given.sort();
        if expected != given {
            return Err(TreeError::SequenceMismatch(parent.index()));
        }
        Ok(())
    }

    /// Children of `parent` stably sorted by key, keyless nodes last
    pub fn sorted_children(&self, parent: NodeId) -> Vec<NodeId> {
        let mut children = self.children(parent).to_vec();
        children.sort_by_key(|id| {
            let key = self.sort_key(*id);
            (key.is_none(), key)
        });
        children
    }

    /// Stable sort of the children vector by key
    pub fn sort_children(&mut self, parent: NodeId) {
        let sorted = self.sorted_children(parent);
        self.node_mut(parent).children = sorted;
    }

    pub fn sort_recursive(&mut self, root: NodeId) {
        for id in self.descendants(root) {
            self.sort_children(id);
        }
    }

    /// Sort children by key and fill missing or duplicate keys
    ///
    /// Ties keep their current relative order.
    pub fn normalize_order(&mut self, parent: NodeId) -> Result<(), TreeError> {
        let sorted = self.sorted_children(parent);
        self.reorder(parent, &sorted)
    }

    fn next_sort_key(&mut self, parent: NodeId) -> SortKey {
        let max = self
            .children(parent)
            .iter()
            .filter_map(|id| self.sort_key(*id))
            .map(SortKey::value)
            .max()
            .unwrap_or(0);

        if let Some(key) = SortKey::new(max + 1) {
            return key;
        }

        // Key space exhausted: renumber the siblings in their current order.
        let sequence = self.children(parent).to_vec();
        for (index, id) in sequence.iter().enumerate() {
            self.node_mut(*id).sort_key = SortKey::new(index as u32 + 1);
        }
        SortKey(sequence.len() as u32 + 1)
    }

    pub fn set_sort_key(&mut self, id: NodeId, key: Option<SortKey>) {
        self.node_mut(id).sort_key = key;
    }

    // ------------------------------------------------------------------
    // Attribute mutations
    // ------------------------------------------------------------------

    /// Set a property, returning the previous value
    pub fn set_property(&mut self, id: NodeId, name: &str, value: impl Into<String>) -> Option<String> {
        let value = value.into();
        let node = self.node_mut(id);
        let previous = match node.properties.iter_mut().find(|p| p.name == name) {
            Some(property) => Some(std::mem::replace(&mut property.value, value)),
            None => {
                node.properties.push(Property {
                    name: name.to_string(),
                    value,
                });
                None
            }
        };
        self.mark_dirty(id);
        previous
    }

    pub fn remove_property(&mut self, id: NodeId, name: &str) -> Option<String> {
        let node = self.node_mut(id);
        let position = node.properties.iter().position(|p| p.name == name)?;
        let removed = node.properties.remove(position);
        self.mark_dirty(id);
        Some(removed.value)
    }

    /// Replace the text content, returning the previous text
    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) -> String {
        let previous = std::mem::replace(&mut self.node_mut(id).text, text.into());
        self.mark_dirty(id);
        previous
    }

    // ------------------------------------------------------------------
    // Dirty tracking
    // ------------------------------------------------------------------

    /// Mark a node and all its ancestors as modified
    pub fn mark_dirty(&mut self, id: NodeId) {
        let ancestors: Vec<NodeId> = self.ancestors(id).collect();
        self.node_mut(id).dirty = true;
        for ancestor in ancestors {
            self.node_mut(ancestor).dirty = true;
        }
    }

    pub fn is_dirty(&self, id: NodeId) -> bool {
        self.node(id).dirty
    }

    pub fn clear_dirty(&mut self, root: NodeId) {
        for id in self.descendants(root) {
            self.node_mut(id).dirty = false;
        }
    }

    // ------------------------------------------------------------------
    // Presentation helpers
    // ------------------------------------------------------------------

    /// Label shown in a node tree view
    pub fn display_name(&self, id: NodeId) -> String {
        let node = self.node(id);
        let base = match node.kind {
            NodeKind::Unknown => node.tag.as_str(),
            kind => kind.display_name(),
        };
        match node.property("name").filter(|name| !name.is_empty()) {
            Some(name) if node.kind != NodeKind::Type && node.kind != NodeKind::DefaultType => {
                format!("{}: {}", base, name)
            }
            _ => base.to_string(),
        }
    }

    /// Slash separated tag path, with a 1-based index for repeated tags
    pub fn path(&self, id: NodeId) -> String {
        let mut segments = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.node(node_id);
            let segment = match node.parent {
                Some(parent) => {
                    let same: Vec<NodeId> = self
                        .children(parent)
                        .iter()
                        .copied()
                        .filter(|sibling| self.node(*sibling).tag == node.tag)
                        .collect();
                    if same.len() > 1 {
                        let index = same.iter().position(|s| *s == node_id).unwrap_or(0) + 1;
                        format!("{}[{}]", node.tag, index)
                    } else {
                        node.tag.clone()
                    }
                }
                None => node.tag.clone(),
            };
            segments.push(segment);
            current = node.parent;
        }
        segments.reverse();
        segments.join("/")
    }

    /// Distinct condition flag names under `root`, in document order
    pub fn flag_labels(&self, root: NodeId) -> Vec<String> {
        let mut labels: Vec<String> = Vec::new();
        for id in self.descendants(root) {
            if self.kind(id) != NodeKind::Flag {
                continue;
            }
            if let Some(name) = self.property(id, "name") {
                if !labels.iter().any(|l| l == name) {
                    labels.push(name.to_string());
                }
            }
        }
        labels
    }

    /// Distinct values assigned to the flag `label` under `root`
    pub fn flag_values(&self, root: NodeId, label: &str) -> Vec<String> {
        let mut values: Vec<String> = Vec::new();
        for id in self.descendants(root) {
            if self.kind(id) == NodeKind::Flag && self.property(id, "name") == Some(label) {
                let text = self.text(id);
                if !values.iter().any(|v| v == text) {
                    values.push(text.to_string());
                }
            }
        }
        values
    }

    /// Structural and attribute-wise equality of two subtrees
    ///
    /// Compares kind, tag, properties, text, sort keys and children in
    /// order. Identities are ignored.
    pub fn subtree_eq(&self, id: NodeId, other: &Tree, other_id: NodeId) -> bool {
        let a = self.node(id);
        let b = other.node(other_id);
        a.kind == b.kind
            && a.tag == b.tag
            && a.properties == b.properties
            && a.text == b.text
            && a.sort_key == b.sort_key
            && a.children.len() == b.children.len()
            && a.children
                .iter()
                .zip(&b.children)
                .all(|(x, y)| self.subtree_eq(*x, other, *y))
    }
}

/// Plan keys for a sibling sequence given the keys they currently carry
fn plan_sort_keys(current: &[Option<SortKey>]) -> Vec<SortKey> {
    let n = current.len();

    // Longest strictly increasing run of existing keys (O(n^2), n is small).
    let mut length = vec![0usize; n];
    let mut previous: Vec<Option<usize>> = vec![None; n];
    for i in 0..n {
        let Some(key_i) = current[i] else { continue };
        length[i] = 1;
        for j in 0..i {
            if let Some(key_j) = current[j] {
                if key_j < key_i && length[j] + 1 > length[i] {
                    length[i] = length[j] + 1;
                    previous[i] = Some(j);
                }
            }
        }
    }

    let mut keep: Vec<Option<u64>> = vec![None; n];
    // Earliest run wins ties, so the first of duplicated keys keeps its key.
    let mut cursor = None;
    let mut best = 0;
    for (i, len) in length.iter().enumerate() {
        if *len > best {
            best = *len;
            cursor = Some(i);
        }
    }
    while let Some(i) = cursor {
        keep[i] = current[i].map(|key| key.value() as u64);
        cursor = previous[i];
    }

    let mut planned = Vec::with_capacity(n);
    let mut lower: u64 = 0;
    let mut i = 0;
    while i < n {
        if let Some(key) = keep[i] {
            planned.push(key);
            lower = key;
            i += 1;
            continue;
        }

        let next_kept = (i..n).find(|j| keep[*j].is_some()).unwrap_or(n);
        let upper = keep.get(next_kept).copied().flatten().unwrap_or(SortKey::MAX as u64 + 1);
        let gap = (next_kept - i) as u64;
        // The gap needs `gap` free keys strictly between `lower` and `upper`.
        if lower + gap >= upper {
            return (1..=n as u32).map(SortKey).collect();
        }
        for offset in 1..=gap {
            planned.push(lower + offset);
        }
        lower += gap;
        i = next_kept;
    }

    planned.into_iter().map(|key| SortKey(key as u32)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(values: &[Option<u32>]) -> Vec<Option<SortKey>> {
        values.iter().map(|v| v.and_then(SortKey::new)).collect()
    }

    fn values(planned: Vec<SortKey>) -> Vec<u32> {
        planned.into_iter().map(SortKey::value).collect()
    }

    #[test]
    fn test_sort_key_format_and_parse() {
        let key = SortKey::new(42).unwrap();
        assert_eq!(key.to_string(), "0000042");
        assert_eq!(SortKey::parse("0000042"), Some(key));
        assert_eq!(SortKey::parse("12345678"), None);
        assert_eq!(SortKey::parse("-1"), None);
        assert_eq!(SortKey::parse(""), None);
    }

    #[test]
    fn test_plan_keeps_increasing_keys() {
        let planned = plan_sort_keys(&keys(&[Some(1), Some(5), Some(9)]));
        assert_eq!(values(planned), vec![1, 5, 9]);
    }

    #[test]
    fn test_plan_fills_gaps_between_kept_keys() {
        // Moving the node with key 9 between 1 and 5 only renumbers it.
        let planned = plan_sort_keys(&keys(&[Some(1), Some(9), Some(5)]));
        assert_eq!(values(planned), vec![1, 2, 5]);
    }

    #[test]
    fn test_plan_appends_missing_keys() {
        let planned = plan_sort_keys(&keys(&[Some(3), None, Some(3)]));
        assert_eq!(values(planned), vec![3, 4, 5]);
    }

    #[test]
    fn test_plan_renumbers_when_no_room() {
        // Moving the last node to the front leaves no key below 1.
        let planned = plan_sort_keys(&keys(&[Some(3), Some(1), Some(2)]));
        assert_eq!(values(planned), vec![1, 2, 3]);

        let planned = plan_sort_keys(&keys(&[Some(2), Some(1)]));
        assert_eq!(values(planned), vec![2, 3]);
    }

    #[test]
    fn test_plan_handles_zero_key() {
        let planned = plan_sort_keys(&keys(&[Some(3), Some(0), Some(1)]));
        assert_eq!(values(planned), vec![1, 2, 3]);

        let planned = plan_sort_keys(&keys(&[None, Some(0), Some(1)]));
        assert_eq!(values(planned), vec![1, 2, 3]);

        let planned = plan_sort_keys(&keys(&[Some(0), Some(1), Some(2)]));
        assert_eq!(values(planned), vec![0, 1, 2]);
    }

    #[test]
    fn test_reorder_before_zero_key_keeps_keys_unique() {
        let mut tree = Tree::new();
        let files = tree.create(NodeKind::Files);
        let ids: Vec<NodeId> = (0..3)
            .map(|value| {
                let id = tree.create(NodeKind::File);
                tree.set_sort_key(id, SortKey::new(value));
                tree.admit_child(files, id).unwrap();
                id
            })
            .collect();

        let sequence = vec![ids[2], ids[0], ids[1]];
        tree.reorder(files, &sequence).unwrap();

        let assigned: Vec<u32> = sequence
            .iter()
            .map(|id| tree.sort_key(*id).unwrap().value())
            .collect();
        assert_eq!(assigned, vec![1, 2, 3]);
    }

    #[test]
    fn test_add_renumbers_when_key_space_is_exhausted() {
        let mut tree = Tree::new();
        let files = tree.create(NodeKind::Files);
        let first = tree.create(NodeKind::File);
        tree.add_child(files, first).unwrap();
        let last = tree.create(NodeKind::File);
        tree.set_sort_key(last, SortKey::new(SortKey::MAX));
        tree.add_child(files, last).unwrap();
        assert_eq!(tree.sort_key(last).map(SortKey::value), Some(SortKey::MAX));

        let added = tree.create(NodeKind::File);
        tree.add_child(files, added).unwrap();

        let assigned: Vec<u32> = tree
            .children(files)
            .iter()
            .map(|id| tree.sort_key(*id).unwrap().value())
            .collect();
        assert_eq!(assigned, vec![1, 2, 3]);
        assert_eq!(tree.children(files), &[first, last, added]);
    }

    fn sample() -> (Tree, NodeId) {
        let mut tree = Tree::new();
        let plugin = tree.create(NodeKind::Plugin);
        (tree, plugin)
    }

    #[test]
    fn test_either_group_blocks_other_member() {
        let mut tree = Tree::new();
        let descriptor = tree.create(NodeKind::TypeDescriptor);
        let type_node = tree.create(NodeKind::Type);

        assert!(tree.can_add_child(descriptor, NodeKind::DependencyType));
        tree.add_child(descriptor, type_node).unwrap();

        assert!(!tree.can_add_child(descriptor, NodeKind::DependencyType));
        assert!(!tree.can_add_child(descriptor, NodeKind::Type));

        tree.remove_child(descriptor, type_node).unwrap();
        assert!(tree.can_add_child(descriptor, NodeKind::DependencyType));
    }

    #[test]
    fn test_instance_limit() {
        let (mut tree, plugin) = sample();
        let first = tree.create(NodeKind::PluginDescription);
        tree.add_child(plugin, first).unwrap();

        let second = tree.create(NodeKind::PluginDescription);
        let err = tree.add_child(plugin, second).unwrap_err();
        assert_eq!(
            err,
            TreeError::violation(NodeKind::Plugin, NodeKind::PluginDescription, Violation::InstanceLimit)
        );
        assert!(!tree.is_attached(second));
    }

    #[test]
    fn test_disallowed_child_is_refused() {
        let (mut tree, plugin) = sample();
        let step = tree.create(NodeKind::InstallStep);
        assert!(tree.add_child(plugin, step).is_err());
        assert!(tree.children(plugin).is_empty());
    }

    #[test]
    fn test_attached_node_cannot_be_added_twice() {
        let mut tree = Tree::new();
        let files_a = tree.create(NodeKind::Files);
        let files_b = tree.create(NodeKind::Files);
        let file = tree.create(NodeKind::File);
        tree.add_child(files_a, file).unwrap();

        let err = tree.add_child(files_b, file).unwrap_err();
        assert!(matches!(
            err,
            TreeError::StructuralViolation {
                violation: Violation::AlreadyAttached,
                ..
            }
        ));
    }

    #[test]
    fn test_add_assigns_next_key_and_remove_keeps_it() {
        let mut tree = Tree::new();
        let files = tree.create(NodeKind::Files);
        let ids: Vec<NodeId> = (0..3)
            .map(|_| {
                let id = tree.create(NodeKind::File);
                tree.add_child(files, id).unwrap();
                id
            })
            .collect();

        let assigned: Vec<u32> = ids.iter().map(|id| tree.sort_key(*id).unwrap().value()).collect();
        assert_eq!(assigned, vec![1, 2, 3]);

        tree.remove_child(files, ids[1]).unwrap();
        assert_eq!(tree.sort_key(ids[1]).map(SortKey::value), Some(2));
        assert_eq!(tree.sort_key(ids[2]).map(SortKey::value), Some(3));

        tree.add_child(files, ids[1]).unwrap();
        tree.sort_children(files);
        assert_eq!(tree.children(files), &ids[..]);
    }

    #[test]
    fn test_reorder_only_touches_moved_sibling() {
        let mut tree = Tree::new();
        let files = tree.create(NodeKind::Files);
        let ids: Vec<NodeId> = (0..4)
            .map(|_| {
                let id = tree.create(NodeKind::File);
                tree.add_child(files, id).unwrap();
                id
            })
            .collect();

        // Move the first file to the end.
        let sequence = vec![ids[1], ids[2], ids[3], ids[0]];
        tree.reorder(files, &sequence).unwrap();

        assert_eq!(tree.children(files), &sequence[..]);
        let assigned: Vec<u32> = sequence
            .iter()
            .map(|id| tree.sort_key(*id).unwrap().value())
            .collect();
        assert_eq!(assigned, vec![2, 3, 4, 5]);
    }

    #[test]
    fn test_reorder_rejects_foreign_sequence() {
        let mut tree = Tree::new();
        let files = tree.create(NodeKind::Files);
        let stranger = tree.create(NodeKind::File);
        assert!(matches!(
            tree.reorder(files, &[stranger]),
            Err(TreeError::SequenceMismatch(_))
        ));
    }

    #[test]
    fn test_copy_subtree_has_fresh_identity() {
        let (mut tree, plugin) = sample();
        tree.set_property(plugin, "name", "Armor");
        let description = tree.create(NodeKind::PluginDescription);
        tree.set_text(description, "Shiny");
        tree.add_child(plugin, description).unwrap();

        let copy = tree.copy_subtree(plugin);
        assert_ne!(copy, plugin);
        assert!(!tree.is_attached(copy));
        assert_ne!(tree.children(copy)[0], description);
        assert_eq!(tree.parent(tree.children(copy)[0]), Some(copy));
        assert!(tree.subtree_eq(plugin, &tree, copy));
    }

    #[test]
    fn test_release_unreachable_frees_and_reuses_slots() {
        let (mut tree, plugin) = sample();
        let description = tree.create(NodeKind::PluginDescription);
        tree.add_child(plugin, description).unwrap();
        let copies: Vec<NodeId> = (0..10).map(|_| tree.copy_subtree(plugin)).collect();
        assert_eq!(tree.len(), 22);

        // A live node keeps its whole tree, root included.
        assert_eq!(tree.release_unreachable(&[description, copies[3]]), 18);
        assert_eq!(tree.len(), 4);
        assert!(tree.contains(plugin));
        assert!(tree.contains(copies[3]));
        assert!(!tree.contains(copies[0]));
        assert!(tree.get(copies[9]).is_none());
        assert_eq!(tree.release_unreachable(&[plugin, copies[3]]), 0);

        // The arena does not grow while released slots are left.
        let reused = tree.create(NodeKind::Image);
        assert!(reused.index() < 22);
        assert_eq!(tree.len(), 5);
        assert_eq!(tree.kind(reused), NodeKind::Image);
        assert!(tree.children(reused).is_empty());
        assert!(!tree.is_attached(reused));
    }

    #[test]
    fn test_extract_copies_only_requested_trees() {
        let (mut tree, plugin) = sample();
        let description = tree.create(NodeKind::PluginDescription);
        tree.set_text(description, "Shiny");
        tree.add_child(plugin, description).unwrap();
        for _ in 0..5 {
            tree.copy_subtree(plugin);
        }
        let other = tree.create(NodeKind::Image);

        let (extracted, ids) = tree.extract(&[plugin, other]);
        assert_eq!(extracted.len(), 3);
        assert_eq!(ids.len(), 3);
        assert!(tree.subtree_eq(plugin, &extracted, ids[&plugin]));
        assert_eq!(extracted.text(ids[&description]), "Shiny");
        assert_eq!(extracted.parent(ids[&description]), Some(ids[&plugin]));
        assert_eq!(extracted.kind(ids[&other]), NodeKind::Image);
    }

    #[test]
    fn test_cycle_is_refused() {
        let mut tree = Tree::new();
        let outer = tree.create(NodeKind::Dependencies);
        let inner = tree.create(NodeKind::Dependencies);
        tree.add_child(outer, inner).unwrap();
        let err = tree.add_child(inner, outer).unwrap_err();
        assert!(matches!(
            err,
            TreeError::StructuralViolation {
                violation: Violation::WouldCreateCycle,
                ..
            }
        ));
    }

    #[test]
    fn test_dirty_propagates_to_ancestors() {
        let mut tree = Tree::new();
        let plugins = tree.create(NodeKind::Plugins);
        let plugin = tree.create(NodeKind::Plugin);
        tree.add_child(plugins, plugin).unwrap();
        tree.clear_dirty(plugins);

        tree.set_property(plugin, "name", "Boots");
        assert!(tree.is_dirty(plugin));
        assert!(tree.is_dirty(plugins));

        tree.clear_dirty(plugins);
        assert!(!tree.is_dirty(plugin));
    }

    #[test]
    fn test_create_seeds_defaults() {
        let mut tree = Tree::new();
        let group = tree.create(NodeKind::Group);
        assert_eq!(tree.property(group, "type"), Some("SelectAny"));
        assert_eq!(tree.property(group, "name"), None);
    }

    #[test]
    fn test_flag_completion_data() {
        let mut tree = Tree::new();
        let flags = tree.create(NodeKind::ConditionFlags);
        for (name, value) in [("Armor", "On"), ("Armor", "Off"), ("Weapon", "On"), ("Armor", "On")] {
            let flag = tree.create(NodeKind::Flag);
            tree.set_property(flag, "name", name);
            tree.set_text(flag, value);
            tree.add_child(flags, flag).unwrap();
        }

        assert_eq!(tree.flag_labels(flags), vec!["Armor", "Weapon"]);
        assert_eq!(tree.flag_values(flags, "Armor"), vec!["On", "Off"]);
    }

    #[test]
    fn test_path_indexes_repeated_tags() {
        let mut tree = Tree::new();
        let files = tree.create(NodeKind::Files);
        let a = tree.create(NodeKind::File);
        let b = tree.create(NodeKind::File);
        let folder = tree.create(NodeKind::Folder);
        tree.add_child(files, a).unwrap();
        tree.add_child(files, b).unwrap();
        tree.add_child(files, folder).unwrap();

        assert_eq!(tree.path(b), "files/file[2]");
        assert_eq!(tree.path(folder), "files/folder");
    }
}
