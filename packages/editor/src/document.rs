//! # Document Handle
//!
//! An installer package being edited: its metadata and configuration trees
//! plus the directory they are saved to.
//!
//! ## Lifecycle
//!
//! ```text
//! Open → Import → Check → Edit → Sort → Check → Export
//!   ↓                                              ↓
//! Package dir                                 fomod/*.xml
//! ```
//!
//! Checks run according to the load or save [`CheckSettings`]: schema
//! errors block unless `validate_ignore` is set, missing resources block
//! only when `warn_ignore` is cleared. Ignored diagnostics are logged.

use crate::EditorError;
use fomod_common::{CheckSettings, FileSystem, RealFileSystem, Settings};
use fomod_linter::{check_resources, validate, Diagnostic};
use fomod_parser::{export_package, import_package, NodeId, Package, Tree};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Editable installer package
#[derive(Debug)]
pub struct Document {
    /// Package directory (if any)
    path: Option<PathBuf>,

    package: Package,
}

impl Document {
    /// Fresh package that has never been saved
    pub fn new() -> Self {
        Self {
            path: None,
            package: Package::new(),
        }
    }

    /// Wrap an already imported package
    pub fn from_package(path: Option<PathBuf>, package: Package) -> Self {
        Self { path, package }
    }

    /// Open the package at `path`
    ///
    /// A directory without installer documents yields a fresh package bound
    /// to that directory.
    pub fn open(path: &Path, settings: &Settings) -> Result<Self, EditorError> {
        let package = match import_package(path)? {
            Some(package) => package,
            None => {
                info!(path = %path.display(), "No installer found, starting a new one");
                Package::new()
            }
        };

        let document = Self {
            path: Some(path.to_path_buf()),
            package,
        };
        document.check(&settings.load, &RealFileSystem)?;

        info!(path = %path.display(), "Opened package");
        Ok(document)
    }

    /// Sort, check and write both documents, then mark everything clean
    pub fn save(&mut self, settings: &Settings) -> Result<(), EditorError> {
        let path = self.path.clone().ok_or(EditorError::NotFileBacked)?;

        for root in self.package.roots() {
            self.package.tree.sort_recursive(root);
        }
        self.check(&settings.save, &RealFileSystem)?;

        export_package(&self.package, &path)?;
        self.package.mark_clean();

        info!(path = %path.display(), "Saved package");
        Ok(())
    }

    /// Bind to a new package directory and save there
    pub fn save_as(&mut self, path: &Path, settings: &Settings) -> Result<(), EditorError> {
        let previous = self.path.replace(path.to_path_buf());
        let result = self.save(settings);
        if result.is_err() {
            self.path = previous;
        }
        result
    }

    /// Run the configured checks, returning the diagnostics that were ignored
    pub fn check(
        &self,
        checks: &CheckSettings,
        fs: &dyn FileSystem,
    ) -> Result<Vec<Diagnostic>, EditorError> {
        let mut ignored = Vec::new();

        if checks.validate {
            let errors = self.validate(fs);
            if !errors.is_empty() {
                if !checks.validate_ignore {
                    return Err(EditorError::SchemaValidation(errors));
                }
                ignored.extend(errors);
            }
        }

        if checks.warnings {
            if let Some(root) = &self.path {
                let missing = self.missing_resources(root, fs);
                if !missing.is_empty() {
                    if !checks.warn_ignore {
                        return Err(EditorError::MissingResources(missing));
                    }
                    ignored.extend(missing);
                }
            }
        }

        for diagnostic in &ignored {
            warn!(rule = %diagnostic.rule, path = %diagnostic.location.path, "{}", diagnostic.message);
        }
        Ok(ignored)
    }

    /// Schema diagnostics for both documents
    pub fn validate(&self, fs: &dyn FileSystem) -> Vec<Diagnostic> {
        self.package
            .roots()
            .into_iter()
            .flat_map(|root| validate(&self.package.tree, root, fs))
            .collect()
    }

    /// Missing resource warnings for both documents
    pub fn missing_resources(&self, package_root: &Path, fs: &dyn FileSystem) -> Vec<Diagnostic> {
        self.package
            .roots()
            .into_iter()
            .flat_map(|root| check_resources(&self.package.tree, root, package_root, fs))
            .collect()
    }

    /// Check if document has unsaved changes
    pub fn is_dirty(&self) -> bool {
        self.package.is_dirty()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn package(&self) -> &Package {
        &self.package
    }

    pub fn tree(&self) -> &Tree {
        &self.package.tree
    }

    pub(crate) fn tree_mut(&mut self) -> &mut Tree {
        &mut self.package.tree
    }

    pub fn info(&self) -> NodeId {
        self.package.info
    }

    pub fn config(&self) -> NodeId {
        self.package.config
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
