//! # Importer
//!
//! Reads a serialized document into a [`Tree`], classifying every element
//! through the type registry.
//!
//! Children that break their parent's structural rules are pruned silently
//! (logged at debug level) so that a slightly malformed document still loads.
//! A child is checked when its end tag is read, against the siblings already
//! admitted, so the first instances in document order win.

use crate::ast::{NodeId, SortKey, Tree};
use crate::error::{ParseError, ParseResult};
use crate::package::{Package, CONFIG_FILE, INFO_FILE, PACKAGE_FOLDER, SORT_KEY_ATTRIBUTE};
use crate::schema::NodeKind;
use fomod_common::{find_entry, RealFileSystem};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::borrow::Cow;
use std::path::Path;
use tracing::{debug, info};

/// An element whose end tag has not been read yet
struct OpenElement {
    id: NodeId,
    text: String,
}

/// Streaming importer for one document
pub struct Importer<'t> {
    tree: &'t mut Tree,
    stack: Vec<OpenElement>,
    root: Option<NodeId>,
}

impl<'t> Importer<'t> {
    pub fn new(tree: &'t mut Tree) -> Self {
        Self {
            tree,
            stack: Vec::new(),
            root: None,
        }
    }

    /// Import a document whose root must classify to `expected`
    pub fn import(mut self, source: &str, expected: NodeKind) -> ParseResult<NodeId> {
        let mut reader = Reader::from_str(source);
        let mut buf = Vec::new();

        loop {
            let pos = reader.buffer_position();
            let event = match reader.read_event_into(&mut buf) {
                Ok(event) => event,
                Err(e) => return Err(ParseError::xml(pos, e.to_string())),
            };

            match event {
                Event::Start(e) => {
                    self.open(&reader, &e, pos)?;
                }
                Event::Empty(e) => {
                    self.open(&reader, &e, pos)?;
                    self.close(expected)?;
                }
                Event::End(_) => {
                    self.close(expected)?;
                }
                Event::Text(e) => {
                    let text = e.unescape().map_err(|e| ParseError::xml(pos, e.to_string()))?;
                    self.push_text(&text);
                }
                Event::CData(e) => {
                    let raw = e.into_inner();
                    self.push_text(&String::from_utf8_lossy(&raw));
                }
                Event::Eof => break,
                // Declaration, comments, processing instructions and doctype
                // carry nothing the tree keeps.
                _ => {}
            }
            buf.clear();
        }

        if let Some(open) = self.stack.last() {
            return Err(ParseError::UnclosedElement {
                pos: reader.buffer_position(),
                tag: self.tree.node(open.id).tag().to_string(),
            });
        }

        let root = self.root.ok_or(ParseError::Empty)?;
        self.tree.clear_dirty(root);
        Ok(root)
    }

    fn open(&mut self, reader: &Reader<&[u8]>, element: &BytesStart, pos: u64) -> ParseResult<()> {
        if self.root.is_some() && self.stack.is_empty() {
            return Err(ParseError::xml(pos, "multiple root elements"));
        }

        let tag = String::from_utf8_lossy(element.name().as_ref()).into_owned();
        let parent_kind = self.stack.last().map(|open| self.tree.kind(open.id));
        let kind = NodeKind::classify(&tag, parent_kind);
        let id = self.tree.create_element(&tag, kind);

        for attr in element.attributes() {
            let attr = attr.map_err(|e| ParseError::xml(pos, e.to_string()))?;
            let name = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .decode_and_unescape_value(reader.decoder())
                .map_err(|e| ParseError::xml(pos, e.to_string()))?;

            if name == SORT_KEY_ATTRIBUTE {
                let key = SortKey::parse(&value);
                if key.is_none() {
                    debug!(tag = %tag, value = %value, "Ignoring malformed sort key");
                }
                self.tree.set_sort_key(id, key);
            } else {
                self.tree.set_property(id, &name, value.into_owned());
            }
        }

        self.stack.push(OpenElement {
            id,
            text: String::new(),
        });
        Ok(())
    }

    fn push_text(&mut self, text: &str) {
        if let Some(open) = self.stack.last_mut() {
            open.text.push_str(text);
        }
    }

    fn close(&mut self, expected: NodeKind) -> ParseResult<()> {
        let Some(open) = self.stack.pop() else {
            return Ok(());
        };
        let id = open.id;
        let kind = self.tree.kind(id);

        if kind.descriptor().has_text && !open.text.trim().is_empty() {
            self.tree.set_text(id, open.text);
        }

        // Children are all read: sort by key, then fill missing or
        // duplicate keys.
        if !self.tree.children(id).is_empty() {
            self.tree
                .normalize_order(id)
                .map_err(|e| ParseError::xml(0, e.to_string()))?;
        }

        match self.stack.last() {
            Some(parent) => {
                let parent = parent.id;
                if let Err(err) = self.tree.admit_child(parent, id) {
                    debug!(
                        tag = %self.tree.node(id).tag(),
                        parent = ?self.tree.kind(parent),
                        reason = %err,
                        "Pruned child"
                    );
                }
            }
            None => {
                if kind != expected {
                    return Err(ParseError::UnexpectedRoot {
                        expected: expected.tag(),
                        found: self.tree.node(id).tag().to_string(),
                    });
                }
                self.tree.set_sort_key(id, None);
                self.root = Some(id);
            }
        }
        Ok(())
    }
}

/// Decode raw document bytes
///
/// Accepts UTF-8 with or without a byte order mark, and UTF-16 in either
/// byte order when a byte order mark is present.
pub fn decode(bytes: &[u8]) -> ParseResult<Cow<'_, str>> {
    match bytes {
        [0xEF, 0xBB, 0xBF, rest @ ..] => std::str::from_utf8(rest)
            .map(Cow::Borrowed)
            .map_err(|e| ParseError::Encoding(e.to_string())),
        [0xFF, 0xFE, rest @ ..] => decode_utf16(rest, u16::from_le_bytes),
        [0xFE, 0xFF, rest @ ..] => decode_utf16(rest, u16::from_be_bytes),
        _ => std::str::from_utf8(bytes)
            .map(Cow::Borrowed)
            .map_err(|e| ParseError::Encoding(e.to_string())),
    }
}

fn decode_utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> ParseResult<Cow<'static, str>> {
    if bytes.len() % 2 != 0 {
        return Err(ParseError::Encoding("odd number of bytes in UTF-16 input".to_string()));
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| unit([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units)
        .map(Cow::Owned)
        .map_err(|e| ParseError::Encoding(e.to_string()))
}

/// Import one document from text into `tree`
pub fn import_str(tree: &mut Tree, source: &str, expected: NodeKind) -> ParseResult<NodeId> {
    Importer::new(tree).import(source, expected)
}

/// Import one document from raw bytes into `tree`
pub fn import_bytes(tree: &mut Tree, bytes: &[u8], expected: NodeKind) -> ParseResult<NodeId> {
    let source = decode(bytes)?;
    import_str(tree, &source, expected)
}

/// Import both documents into a fresh [`Package`]
pub fn import_documents(info: &[u8], config: &[u8]) -> ParseResult<Package> {
    let mut tree = Tree::new();
    let info = import_bytes(&mut tree, info, NodeKind::Info)?;
    let config = import_bytes(&mut tree, config, NodeKind::Config)?;
    // Pruned elements are left detached by the importer.
    tree.release_unreachable(&[info, config]);
    Ok(Package { tree, info, config })
}

/// Import the installer documents of a package directory
///
/// The `fomod` folder and document files are located ignoring case. Returns
/// `Ok(None)` when there is no configuration document; a missing metadata
/// document is replaced by an empty one.
pub fn import_package(path: &Path) -> ParseResult<Option<Package>> {
    let fs = RealFileSystem;
    let Some(folder) = find_entry(&fs, path, PACKAGE_FOLDER) else {
        debug!(path = %path.display(), "No installer folder in package");
        return Ok(None);
    };
    let Some(config_path) = find_entry(&fs, &folder, CONFIG_FILE) else {
        debug!(path = %folder.display(), "No configuration document in package");
        return Ok(None);
    };

    let mut tree = Tree::new();
    let info = match find_entry(&fs, &folder, INFO_FILE) {
        Some(info_path) => import_bytes(&mut tree, &std::fs::read(&info_path)?, NodeKind::Info)?,
        None => {
            let root = tree.create(NodeKind::Info);
            tree.clear_dirty(root);
            root
        }
    };
    let config = import_bytes(&mut tree, &std::fs::read(&config_path)?, NodeKind::Config)?;
    tree.release_unreachable(&[info, config]);

    info!(path = %path.display(), nodes = tree.len(), "Imported package");
    Ok(Some(Package { tree, info, config }))
}
