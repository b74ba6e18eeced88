pub mod ast;
pub mod error;
pub mod package;
pub mod parser;
pub mod schema;
pub mod serializer;

pub use ast::{GroupViolation, Node, NodeId, Property, SortKey, Tree};
pub use error::{ParseError, ParseResult, TreeError, Violation};
pub use package::{Package, CONFIG_FILE, INFO_FILE, PACKAGE_FOLDER, SORT_KEY_ATTRIBUTE};
pub use parser::{decode, import_bytes, import_documents, import_package, import_str, Importer};
pub use schema::{NodeKind, PropertyDef, PropertyKind, PropertyValue, TypeDescriptor};
pub use serializer::{export, export_package, serialize, Serializer};
