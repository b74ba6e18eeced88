//! # Type Registry
//!
//! Maps a tag (plus the parent's kind for tags reused in several places) to a
//! [`NodeKind`] and its immutable [`TypeDescriptor`].
//!
//! The table is fixed at compile time. Unknown tags classify to
//! [`NodeKind::Unknown`], which no descriptor allows as a child, so the
//! importer silently prunes them.

use serde::{Deserialize, Serialize};

/// Every node type of the metadata (`Info.xml`) and configuration
/// (`ModuleConfig.xml`) documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeKind {
    // Info.xml
    Info,
    Name,
    Author,
    Version,
    Id,
    Website,
    Description,
    Groups,
    GroupElement,

    // ModuleConfig.xml
    Config,
    ModuleName,
    ModuleImage,
    ModuleDependencies,
    RequiredInstallFiles,
    InstallSteps,
    ConditionalFileInstalls,
    FileDependency,
    FlagDependency,
    GameDependency,
    FommDependency,
    Dependencies,
    File,
    Folder,
    InstallStep,
    Visible,
    OptionalFileGroups,
    Group,
    Plugins,
    Plugin,
    PluginDescription,
    Image,
    Files,
    ConditionFlags,
    Flag,
    TypeDescriptor,
    Type,
    DependencyType,
    DefaultType,
    /// `patterns` inside `dependencyType`
    InstallPatterns,
    /// `pattern` inside `dependencyType/patterns`
    InstallPattern,
    /// `patterns` inside `conditionalFileInstalls`
    Patterns,
    /// `pattern` inside `conditionalFileInstalls/patterns`
    Pattern,

    /// Any tag the registry does not know
    Unknown,
}

impl NodeKind {
    /// Every kind, in declaration order
    pub const ALL: [NodeKind; 43] = [
        NodeKind::Info,
        NodeKind::Name,
        NodeKind::Author,
        NodeKind::Version,
        NodeKind::Id,
        NodeKind::Website,
        NodeKind::Description,
        NodeKind::Groups,
        NodeKind::GroupElement,
        NodeKind::Config,
        NodeKind::ModuleName,
        NodeKind::ModuleImage,
        NodeKind::ModuleDependencies,
        NodeKind::RequiredInstallFiles,
        NodeKind::InstallSteps,
        NodeKind::ConditionalFileInstalls,
        NodeKind::FileDependency,
        NodeKind::FlagDependency,
        NodeKind::GameDependency,
        NodeKind::FommDependency,
        NodeKind::Dependencies,
        NodeKind::File,
        NodeKind::Folder,
        NodeKind::InstallStep,
        NodeKind::Visible,
        NodeKind::OptionalFileGroups,
        NodeKind::Group,
        NodeKind::Plugins,
        NodeKind::Plugin,
        NodeKind::PluginDescription,
        NodeKind::Image,
        NodeKind::Files,
        NodeKind::ConditionFlags,
        NodeKind::Flag,
        NodeKind::TypeDescriptor,
        NodeKind::Type,
        NodeKind::DependencyType,
        NodeKind::DefaultType,
        NodeKind::InstallPatterns,
        NodeKind::InstallPattern,
        NodeKind::Patterns,
        NodeKind::Pattern,
        NodeKind::Unknown,
    ];

    /// Classify an element from its tag and its parent's kind
    pub fn classify(tag: &str, parent: Option<NodeKind>) -> NodeKind {
        match tag {
            "fomod" => NodeKind::Info,
            "Name" => NodeKind::Name,
            "Author" => NodeKind::Author,
            "Version" => NodeKind::Version,
            "Id" => NodeKind::Id,
            "Website" => NodeKind::Website,
            "Description" => NodeKind::Description,
            "Groups" => NodeKind::Groups,
            "element" => NodeKind::GroupElement,

            "config" => NodeKind::Config,
            "moduleName" => NodeKind::ModuleName,
            "moduleImage" => NodeKind::ModuleImage,
            "moduleDependencies" => NodeKind::ModuleDependencies,
            "requiredInstallFiles" => NodeKind::RequiredInstallFiles,
            "installSteps" => NodeKind::InstallSteps,
            "conditionalFileInstalls" => NodeKind::ConditionalFileInstalls,
            "fileDependency" => NodeKind::FileDependency,
            "flagDependency" => NodeKind::FlagDependency,
            "gameDependency" => NodeKind::GameDependency,
            "fommDependency" => NodeKind::FommDependency,
            "dependencies" => NodeKind::Dependencies,
            "file" => NodeKind::File,
            "folder" => NodeKind::Folder,
            "installStep" => NodeKind::InstallStep,
            "visible" => NodeKind::Visible,
            "optionalFileGroups" => NodeKind::OptionalFileGroups,
            "group" => NodeKind::Group,
            "plugins" => NodeKind::Plugins,
            "plugin" => NodeKind::Plugin,
            "description" => NodeKind::PluginDescription,
            "image" => NodeKind::Image,
            "files" => NodeKind::Files,
            "conditionFlags" => NodeKind::ConditionFlags,
            "flag" => NodeKind::Flag,
            "typeDescriptor" => NodeKind::TypeDescriptor,
            "type" => NodeKind::Type,
            "dependencyType" => NodeKind::DependencyType,
            "defaultType" => NodeKind::DefaultType,

            "patterns" => match parent {
                Some(NodeKind::DependencyType) => NodeKind::InstallPatterns,
                Some(NodeKind::ConditionalFileInstalls) => NodeKind::Patterns,
                _ => NodeKind::Unknown,
            },
            "pattern" => match parent {
                Some(NodeKind::InstallPatterns) => NodeKind::InstallPattern,
                Some(NodeKind::Patterns) => NodeKind::Pattern,
                _ => NodeKind::Unknown,
            },

            _ => NodeKind::Unknown,
        }
    }

    /// The immutable structural rules for this kind
    pub fn descriptor(self) -> &'static TypeDescriptor {
        &REGISTRY[self as usize]
    }

    /// Serialized tag name (`"#unknown"` for [`NodeKind::Unknown`])
    pub fn tag(self) -> &'static str {
        self.descriptor().tag
    }

    pub fn display_name(self) -> &'static str {
        self.descriptor().display_name
    }

    /// True for the two document roots
    pub fn is_root(self) -> bool {
        matches!(self, NodeKind::Info | NodeKind::Config)
    }
}

/// Value kind of an editable property
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Text,
    Integer,
    Boolean,
    Choice(&'static [&'static str]),
    /// Path to a file inside the package
    File,
    /// Path to a folder inside the package
    Folder,
    /// Six-digit hexadecimal colour
    Colour,
}

/// A property value parsed according to its [`PropertyKind`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    Text(String),
    Integer(i64),
    Boolean(bool),
    Choice(&'static str),
    Path(String),
    Colour(String),
}

/// Definition of an editable property (an XML attribute)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyDef {
    pub name: &'static str,
    pub display_name: &'static str,
    pub kind: PropertyKind,
    pub default: Option<&'static str>,
    pub required: bool,
}

impl PropertyDef {
    const fn optional(name: &'static str, display_name: &'static str, kind: PropertyKind) -> Self {
        Self {
            name,
            display_name,
            kind,
            default: None,
            required: false,
        }
    }

    const fn required(name: &'static str, display_name: &'static str, kind: PropertyKind) -> Self {
        Self {
            name,
            display_name,
            kind,
            default: None,
            required: true,
        }
    }

    const fn with_default(mut self, default: &'static str) -> Self {
        self.default = Some(default);
        self
    }

    /// Parse a raw attribute value
    pub fn parse(&self, raw: &str) -> Result<PropertyValue, String> {
        match self.kind {
            PropertyKind::Text => Ok(PropertyValue::Text(raw.to_string())),
            PropertyKind::Integer => raw
                .trim()
                .parse::<i64>()
                .map(PropertyValue::Integer)
                .map_err(|_| format!("'{}' is not an integer", raw)),
            PropertyKind::Boolean => match raw.trim() {
                "true" | "1" => Ok(PropertyValue::Boolean(true)),
                "false" | "0" => Ok(PropertyValue::Boolean(false)),
                _ => Err(format!("'{}' is not a boolean", raw)),
            },
            PropertyKind::Choice(choices) => choices
                .iter()
                .find(|choice| **choice == raw)
                .map(|choice| PropertyValue::Choice(*choice))
                .ok_or_else(|| format!("'{}' is not one of {}", raw, choices.join(", "))),
            PropertyKind::File | PropertyKind::Folder => Ok(PropertyValue::Path(raw.to_string())),
            PropertyKind::Colour => {
                let valid = raw.len() == 6 && raw.chars().all(|c| c.is_ascii_hexdigit());
                if valid {
                    Ok(PropertyValue::Colour(raw.to_string()))
                } else {
                    Err(format!("'{}' is not a hexadecimal colour", raw))
                }
            }
        }
    }
}

/// Structural rules for one node kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeDescriptor {
    pub kind: NodeKind,
    pub tag: &'static str,
    pub display_name: &'static str,
    pub allowed_children: &'static [NodeKind],
    /// Kinds that must appear at least once
    pub required_children: &'static [NodeKind],
    /// Groups where at most one member kind may be present (and, for a
    /// valid document, exactly one)
    pub either_groups: &'static [&'static [NodeKind]],
    /// Groups where the union must be non-empty
    pub at_least_one_groups: &'static [&'static [NodeKind]],
    /// Child kinds limited to a single instance among siblings
    pub single_children: &'static [NodeKind],
    pub properties: &'static [PropertyDef],
    /// Whether the node carries free-form text content
    pub has_text: bool,
}

impl TypeDescriptor {
    const fn new(kind: NodeKind, tag: &'static str, display_name: &'static str) -> Self {
        Self {
            kind,
            tag,
            display_name,
            allowed_children: &[],
            required_children: &[],
            either_groups: &[],
            at_least_one_groups: &[],
            single_children: &[],
            properties: &[],
            has_text: false,
        }
    }

    const fn children(mut self, children: &'static [NodeKind]) -> Self {
        self.allowed_children = children;
        self
    }

    const fn required(mut self, children: &'static [NodeKind]) -> Self {
        self.required_children = children;
        self
    }

    const fn either(mut self, groups: &'static [&'static [NodeKind]]) -> Self {
        self.either_groups = groups;
        self
    }

    const fn at_least_one(mut self, groups: &'static [&'static [NodeKind]]) -> Self {
        self.at_least_one_groups = groups;
        self
    }

    const fn single(mut self, children: &'static [NodeKind]) -> Self {
        self.single_children = children;
        self
    }

    const fn props(mut self, properties: &'static [PropertyDef]) -> Self {
        self.properties = properties;
        self
    }

    const fn text(mut self) -> Self {
        self.has_text = true;
        self
    }

    pub fn allows(&self, kind: NodeKind) -> bool {
        self.allowed_children.contains(&kind)
    }

    /// Maximum instances of `kind` among this node's children
    pub fn max_instances(&self, kind: NodeKind) -> Option<usize> {
        if self.single_children.contains(&kind) {
            Some(1)
        } else {
            None
        }
    }

    /// The either-group containing `kind`, if any
    pub fn either_group_of(&self, kind: NodeKind) -> Option<&'static [NodeKind]> {
        self.either_groups.iter().copied().find(|group| group.contains(&kind))
    }

    pub fn property(&self, name: &str) -> Option<&'static PropertyDef> {
        self.properties.iter().find(|def| def.name == name)
    }
}

use NodeKind as K;
use PropertyKind as P;

const ORDERS: &[&str] = &["Ascending", "Descending", "Explicit"];
const OPERATORS: &[&str] = &["And", "Or"];
const FILE_STATES: &[&str] = &["Missing", "Inactive", "Active"];
const GROUP_TYPES: &[&str] = &[
    "SelectAtLeastOne",
    "SelectAtMostOne",
    "SelectExactlyOne",
    "SelectAll",
    "SelectAny",
];
const PLUGIN_TYPES: &[&str] = &["Required", "Optional", "Recommended", "NotUsable", "CouldBeUsable"];
const NAME_POSITIONS: &[&str] = &["Left", "Right", "RightOfImage"];

const DEPENDENCY_KINDS: &[NodeKind] = &[
    K::FileDependency,
    K::FlagDependency,
    K::GameDependency,
    K::FommDependency,
    K::Dependencies,
];
const FILE_KINDS: &[NodeKind] = &[K::File, K::Folder];

const OPERATOR_PROPS: &[PropertyDef] =
    &[PropertyDef::required("operator", "Type", P::Choice(OPERATORS)).with_default("And")];
const ORDER_PROPS: &[PropertyDef] =
    &[PropertyDef::required("order", "Order", P::Choice(ORDERS)).with_default("Ascending")];
const PLUGIN_TYPE_PROPS: &[PropertyDef] =
    &[PropertyDef::required("name", "Name", P::Choice(PLUGIN_TYPES)).with_default("Optional")];

const fn file_props(source_kind: PropertyKind) -> [PropertyDef; 5] {
    [
        PropertyDef::required("source", "Source", source_kind),
        PropertyDef::optional("destination", "Destination", P::Text),
        PropertyDef::optional("alwaysInstall", "Always Install", P::Boolean),
        PropertyDef::optional("installIfUsable", "Install If Usable", P::Boolean),
        PropertyDef::optional("priority", "Priority", P::Integer),
    ]
}

const FILE_PROPS: [PropertyDef; 5] = file_props(P::File);
const FOLDER_PROPS: [PropertyDef; 5] = file_props(P::Folder);

static REGISTRY: [TypeDescriptor; 43] = [
    TypeDescriptor::new(K::Info, "fomod", "Info").children(&[
        K::Name,
        K::Author,
        K::Version,
        K::Id,
        K::Website,
        K::Description,
        K::Groups,
    ]).single(&[K::Name, K::Author, K::Version, K::Id, K::Website, K::Description, K::Groups]),
    TypeDescriptor::new(K::Name, "Name", "Name").text(),
    TypeDescriptor::new(K::Author, "Author", "Author").text(),
    TypeDescriptor::new(K::Version, "Version", "Version")
        .text()
        .props(&[PropertyDef::optional("MachineVersion", "Machine Version", P::Text)]),
    TypeDescriptor::new(K::Id, "Id", "ID").text(),
    TypeDescriptor::new(K::Website, "Website", "Website").text(),
    TypeDescriptor::new(K::Description, "Description", "Description").text(),
    TypeDescriptor::new(K::Groups, "Groups", "Categories").children(&[K::GroupElement]),
    TypeDescriptor::new(K::GroupElement, "element", "Category").text(),
    TypeDescriptor::new(K::Config, "config", "Config")
        .children(&[
            K::ModuleName,
            K::ModuleImage,
            K::ModuleDependencies,
            K::RequiredInstallFiles,
            K::InstallSteps,
            K::ConditionalFileInstalls,
        ])
        .required(&[K::ModuleName])
        .single(&[
            K::ModuleName,
            K::ModuleImage,
            K::ModuleDependencies,
            K::RequiredInstallFiles,
            K::InstallSteps,
            K::ConditionalFileInstalls,
        ]),
    TypeDescriptor::new(K::ModuleName, "moduleName", "Name").text().props(&[
        PropertyDef::optional("position", "Position", P::Choice(NAME_POSITIONS)),
        PropertyDef::optional("colour", "Colour", P::Colour),
    ]),
    TypeDescriptor::new(K::ModuleImage, "moduleImage", "Image").props(&[
        PropertyDef::required("path", "Path", P::File),
        PropertyDef::optional("showImage", "Show Image", P::Boolean),
        PropertyDef::optional("showFade", "Show Fade", P::Boolean),
        PropertyDef::optional("height", "Height", P::Integer),
    ]),
    TypeDescriptor::new(K::ModuleDependencies, "moduleDependencies", "Mod Dependencies")
        .children(DEPENDENCY_KINDS)
        .at_least_one(&[DEPENDENCY_KINDS])
        .props(OPERATOR_PROPS),
    TypeDescriptor::new(K::RequiredInstallFiles, "requiredInstallFiles", "Mod Requirements")
        .children(FILE_KINDS)
        .at_least_one(&[FILE_KINDS]),
    TypeDescriptor::new(K::InstallSteps, "installSteps", "Installation Steps")
        .children(&[K::InstallStep])
        .required(&[K::InstallStep])
        .props(ORDER_PROPS),
    TypeDescriptor::new(K::ConditionalFileInstalls, "conditionalFileInstalls", "Conditional Installation")
        .children(&[K::Patterns])
        .required(&[K::Patterns])
        .single(&[K::Patterns]),
    TypeDescriptor::new(K::FileDependency, "fileDependency", "File Dependency").props(&[
        PropertyDef::required("file", "File", P::Text),
        PropertyDef::required("state", "State", P::Choice(FILE_STATES)).with_default("Active"),
    ]),
    TypeDescriptor::new(K::FlagDependency, "flagDependency", "Flag Dependency").props(&[
        PropertyDef::required("flag", "Flag", P::Text),
        PropertyDef::optional("value", "Value", P::Text).with_default(""),
    ]),
    TypeDescriptor::new(K::GameDependency, "gameDependency", "Game Dependency")
        .props(&[PropertyDef::required("version", "Version", P::Text)]),
    TypeDescriptor::new(K::FommDependency, "fommDependency", "Mod Manager Dependency")
        .props(&[PropertyDef::required("version", "Version", P::Text)]),
    TypeDescriptor::new(K::Dependencies, "dependencies", "Dependencies")
        .children(DEPENDENCY_KINDS)
        .at_least_one(&[DEPENDENCY_KINDS])
        .props(OPERATOR_PROPS),
    TypeDescriptor::new(K::File, "file", "File").props(&FILE_PROPS),
    TypeDescriptor::new(K::Folder, "folder", "Folder").props(&FOLDER_PROPS),
    TypeDescriptor::new(K::InstallStep, "installStep", "Installation Step")
        .children(&[K::Visible, K::OptionalFileGroups])
        .required(&[K::OptionalFileGroups])
        .single(&[K::Visible, K::OptionalFileGroups])
        .props(&[PropertyDef::required("name", "Name", P::Text)]),
    TypeDescriptor::new(K::Visible, "visible", "Visibility")
        .children(DEPENDENCY_KINDS)
        .at_least_one(&[DEPENDENCY_KINDS])
        .props(OPERATOR_PROPS),
    TypeDescriptor::new(K::OptionalFileGroups, "optionalFileGroups", "Option Groups")
        .children(&[K::Group])
        .required(&[K::Group])
        .props(ORDER_PROPS),
    TypeDescriptor::new(K::Group, "group", "Group")
        .children(&[K::Plugins])
        .required(&[K::Plugins])
        .single(&[K::Plugins])
        .props(&[
            PropertyDef::required("name", "Name", P::Text),
            PropertyDef::required("type", "Type", P::Choice(GROUP_TYPES)).with_default("SelectAny"),
        ]),
    TypeDescriptor::new(K::Plugins, "plugins", "Plugins")
        .children(&[K::Plugin])
        .required(&[K::Plugin])
        .props(ORDER_PROPS),
    TypeDescriptor::new(K::Plugin, "plugin", "Plugin")
        .children(&[
            K::PluginDescription,
            K::Image,
            K::Files,
            K::ConditionFlags,
            K::TypeDescriptor,
        ])
        .required(&[K::PluginDescription, K::TypeDescriptor])
        .at_least_one(&[&[K::Files, K::ConditionFlags]])
        .single(&[
            K::PluginDescription,
            K::Image,
            K::Files,
            K::ConditionFlags,
            K::TypeDescriptor,
        ])
        .props(&[PropertyDef::required("name", "Name", P::Text)]),
    TypeDescriptor::new(K::PluginDescription, "description", "Description").text(),
    TypeDescriptor::new(K::Image, "image", "Image")
        .props(&[PropertyDef::required("path", "Path", P::File)]),
    TypeDescriptor::new(K::Files, "files", "Files")
        .children(FILE_KINDS)
        .at_least_one(&[FILE_KINDS]),
    TypeDescriptor::new(K::ConditionFlags, "conditionFlags", "Flags")
        .children(&[K::Flag])
        .required(&[K::Flag]),
    TypeDescriptor::new(K::Flag, "flag", "Flag")
        .text()
        .props(&[PropertyDef::required("name", "Label", P::Text)]),
    TypeDescriptor::new(K::TypeDescriptor, "typeDescriptor", "Type Descriptor")
        .children(&[K::DependencyType, K::Type])
        .either(&[&[K::DependencyType, K::Type]])
        .single(&[K::DependencyType, K::Type]),
    TypeDescriptor::new(K::Type, "type", "Type").props(PLUGIN_TYPE_PROPS),
    TypeDescriptor::new(K::DependencyType, "dependencyType", "Dependency Type")
        .children(&[K::DefaultType, K::InstallPatterns])
        .required(&[K::DefaultType, K::InstallPatterns])
        .single(&[K::DefaultType, K::InstallPatterns]),
    TypeDescriptor::new(K::DefaultType, "defaultType", "Default Type").props(PLUGIN_TYPE_PROPS),
    TypeDescriptor::new(K::InstallPatterns, "patterns", "Patterns")
        .children(&[K::InstallPattern])
        .required(&[K::InstallPattern]),
    TypeDescriptor::new(K::InstallPattern, "pattern", "Pattern")
        .children(&[K::Dependencies, K::Type])
        .required(&[K::Dependencies, K::Type])
        .single(&[K::Dependencies, K::Type]),
    TypeDescriptor::new(K::Patterns, "patterns", "Patterns")
        .children(&[K::Pattern])
        .required(&[K::Pattern]),
    TypeDescriptor::new(K::Pattern, "pattern", "Pattern")
        .children(&[K::Dependencies, K::Files])
        .required(&[K::Dependencies, K::Files])
        .single(&[K::Dependencies, K::Files]),
    TypeDescriptor::new(K::Unknown, "#unknown", "Unknown"),
];
