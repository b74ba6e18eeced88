//! The two documents of an installer package held in one arena

use crate::ast::{NodeId, Tree};
use crate::schema::NodeKind;

/// Subfolder of a package directory holding the installer documents
pub const PACKAGE_FOLDER: &str = "fomod";

/// Metadata document file name
pub const INFO_FILE: &str = "Info.xml";

/// Configuration document file name
pub const CONFIG_FILE: &str = "ModuleConfig.xml";

/// Attribute carrying a node's persisted sort key
pub const SORT_KEY_ATTRIBUTE: &str = "user_sort_order";

const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
const CONFIG_SCHEMA: &str = "http://qconsulting.ca/fo3/ModConfig5.0.xsd";

/// Metadata and configuration roots sharing one [`Tree`]
#[derive(Debug, Clone)]
pub struct Package {
    pub tree: Tree,
    pub info: NodeId,
    pub config: NodeId,
}

impl Package {
    /// A fresh, empty package
    ///
    /// The configuration root references the public schema and carries the
    /// one child it requires.
    pub fn new() -> Self {
        let mut tree = Tree::new();
        let info = tree.create(NodeKind::Info);
        let config = tree.create(NodeKind::Config);
        tree.set_property(config, "xmlns:xsi", XSI_NAMESPACE);
        tree.set_property(config, "xsi:noNamespaceSchemaLocation", CONFIG_SCHEMA);

        let module_name = tree.create(NodeKind::ModuleName);
        // A freshly created config always accepts its required child.
        let _ = tree.add_child(config, module_name);

        tree.clear_dirty(info);
        tree.clear_dirty(config);
        Self { tree, info, config }
    }

    pub fn roots(&self) -> [NodeId; 2] {
        [self.info, self.config]
    }

    /// True if either document changed since the last [`Package::mark_clean`]
    pub fn is_dirty(&self) -> bool {
        self.tree.is_dirty(self.info) || self.tree.is_dirty(self.config)
    }

    pub fn mark_clean(&mut self) {
        self.tree.clear_dirty(self.info);
        self.tree.clear_dirty(self.config);
    }
}

impl Default for Package {
    fn default() -> Self {
        Self::new()
    }
}
