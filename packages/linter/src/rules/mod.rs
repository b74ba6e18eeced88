mod child_groups;
mod missing_resource;
mod property_values;
mod required_children;

pub use child_groups::ChildGroupsRule;
pub use missing_resource::MissingResourceRule;
pub use property_values::PropertyValuesRule;
pub use required_children::RequiredChildrenRule;

use crate::diagnostic::{Diagnostic, Location};
use fomod_common::FileSystem;
use fomod_parser::{NodeId, Tree};
use std::path::Path;

/// What a rule can see while checking a node
pub struct LintContext<'a> {
    pub tree: &'a Tree,

    /// Package directory, for rules that resolve resources on disk
    pub package_root: Option<&'a Path>,

    pub fs: &'a dyn FileSystem,
}

impl<'a> LintContext<'a> {
    pub fn new(tree: &'a Tree, fs: &'a dyn FileSystem) -> Self {
        Self {
            tree,
            package_root: None,
            fs,
        }
    }

    pub fn with_package_root(mut self, root: &'a Path) -> Self {
        self.package_root = Some(root);
        self
    }

    pub fn location(&self, id: NodeId) -> Location {
        Location {
            node: id,
            path: self.tree.path(id),
        }
    }
}

/// Trait for implementing lint rules
pub trait LintRule {
    /// Unique identifier for this rule
    fn name(&self) -> &'static str;

    /// Human-readable description
    fn description(&self) -> &'static str;

    /// Check one node; the linter visits every node of the document
    fn check_node(&self, ctx: &LintContext, id: NodeId) -> Vec<Diagnostic>;
}

/// Registry of all available lint rules
pub struct RuleRegistry {
    rules: Vec<Box<dyn LintRule>>,
}

impl RuleRegistry {
    /// Create a new registry with the schema validation rules
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(RequiredChildrenRule),
                Box::new(ChildGroupsRule),
                Box::new(PropertyValuesRule),
            ],
        }
    }

    /// Registry holding only the missing resource rule
    pub fn resources() -> Self {
        Self {
            rules: vec![Box::new(MissingResourceRule)],
        }
    }

    /// Get all registered rules
    pub fn rules(&self) -> &[Box<dyn LintRule>] {
        &self.rules
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("rules", &format!("{} rules", self.rules.len()))
            .finish()
    }
}
