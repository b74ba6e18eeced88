use crate::diagnostic::Diagnostic;
use crate::rules::{LintContext, RuleRegistry};
use fomod_common::FileSystem;
use fomod_parser::{NodeId, Tree};
use std::path::Path;

/// Options for configuring the linter
#[derive(Debug, Default)]
pub struct LintOptions {
    /// Custom rule registry (uses default if None)
    pub registry: Option<RuleRegistry>,
}

/// Lint a document and return diagnostics in document order
pub fn lint_document(ctx: &LintContext, root: NodeId, options: LintOptions) -> Vec<Diagnostic> {
    let registry = options.registry.unwrap_or_default();
    let mut diagnostics = Vec::new();

    for id in ctx.tree.descendants(root) {
        for rule in registry.rules() {
            diagnostics.extend(rule.check_node(ctx, id));
        }
    }

    diagnostics
}

/// Schema validation: structural and attribute errors
pub fn validate(tree: &Tree, root: NodeId, fs: &dyn FileSystem) -> Vec<Diagnostic> {
    let ctx = LintContext::new(tree, fs);
    lint_document(&ctx, root, LintOptions::default())
}

/// Resource check: warnings for paths missing from the package
pub fn check_resources(
    tree: &Tree,
    root: NodeId,
    package_root: &Path,
    fs: &dyn FileSystem,
) -> Vec<Diagnostic> {
    let ctx = LintContext::new(tree, fs).with_package_root(package_root);
    lint_document(
        &ctx,
        root,
        LintOptions {
            registry: Some(RuleRegistry::resources()),
        },
    )
}
