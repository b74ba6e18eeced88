use crate::ast::{NodeId, Tree};
use crate::package::{Package, CONFIG_FILE, INFO_FILE, PACKAGE_FOLDER, SORT_KEY_ATTRIBUTE};
use fomod_common::{find_entry, RealFileSystem};
use quick_xml::escape::{escape, partial_escape};
use std::path::Path;
use tracing::info;

const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>";

/// Serializer converts a document tree back to XML
///
/// Children are written in sort key order without touching the tree, so the
/// output only depends on the tree's content. Each node's sort key is
/// written as the last attribute.
pub struct Serializer {
    indent_level: usize,
    indent_string: String,
}

impl Serializer {
    pub fn new() -> Self {
        Self {
            indent_level: 0,
            indent_string: "    ".to_string(), // 4 spaces
        }
    }

    pub fn with_indent(indent: &str) -> Self {
        Self {
            indent_level: 0,
            indent_string: indent.to_string(),
        }
    }

    /// Serialize a whole document, with XML declaration
    pub fn serialize(&mut self, tree: &Tree, root: NodeId) -> String {
        let mut output = String::new();
        output.push_str(XML_DECLARATION);
        output.push('\n');
        self.serialize_node(tree, root, &mut output);
        output
    }

    /// Serialize a single subtree, without declaration
    pub fn serialize_fragment(&mut self, tree: &Tree, id: NodeId) -> String {
        let mut output = String::new();
        self.serialize_node(tree, id, &mut output);
        output
    }

    fn serialize_node(&mut self, tree: &Tree, id: NodeId, output: &mut String) {
        let node = tree.node(id);

        self.write_indent(output);
        output.push('<');
        output.push_str(node.tag());

        for property in node.properties() {
            output.push(' ');
            output.push_str(&property.name);
            output.push_str("=\"");
            output.push_str(&escape(property.value.as_str()));
            output.push('"');
        }

        if let Some(key) = node.sort_key() {
            output.push_str(&format!(" {}=\"{}\"", SORT_KEY_ATTRIBUTE, key));
        }

        let children = tree.sorted_children(id);
        if children.is_empty() {
            if node.text().is_empty() {
                output.push_str("/>\n");
            } else {
                output.push('>');
                output.push_str(&partial_escape(node.text()));
                output.push_str("</");
                output.push_str(node.tag());
                output.push_str(">\n");
            }
            return;
        }

        output.push_str(">\n");
        self.indent_level += 1;
        for child in children {
            self.serialize_node(tree, child, output);
        }
        self.indent_level -= 1;

        self.write_indent(output);
        output.push_str("</");
        output.push_str(node.tag());
        output.push_str(">\n");
    }

    fn write_indent(&self, output: &mut String) {
        for _ in 0..self.indent_level {
            output.push_str(&self.indent_string);
        }
    }
}

impl Default for Serializer {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience function to serialize a document
pub fn serialize(tree: &Tree, root: NodeId) -> String {
    Serializer::new().serialize(tree, root)
}

/// Serialize both documents of a package: `(metadata, configuration)`
pub fn export(package: &Package) -> (String, String) {
    let mut serializer = Serializer::new();
    let info = serializer.serialize(&package.tree, package.info);
    let config = serializer.serialize(&package.tree, package.config);
    (info, config)
}

/// Write both documents into the package's `fomod` folder
///
/// The folder is created if needed. Existing files are overwritten under
/// their current name, whatever its case.
pub fn export_package(package: &Package, path: &Path) -> std::io::Result<()> {
    let fs = RealFileSystem;
    let folder = match find_entry(&fs, path, PACKAGE_FOLDER) {
        Some(folder) => folder,
        None => {
            let folder = path.join(PACKAGE_FOLDER);
            std::fs::create_dir_all(&folder)?;
            folder
        }
    };

    let (info, config) = export(package);
    let info_path = find_entry(&fs, &folder, INFO_FILE).unwrap_or_else(|| folder.join(INFO_FILE));
    let config_path =
        find_entry(&fs, &folder, CONFIG_FILE).unwrap_or_else(|| folder.join(CONFIG_FILE));

    std::fs::write(&info_path, info)?;
    std::fs::write(&config_path, config)?;

    info!(path = %path.display(), "Exported package");
    Ok(())
}
