use crate::diagnostic::Diagnostic;
use crate::rules::{LintContext, LintRule};
use fomod_common::resolve_in_package;
use fomod_parser::{NodeId, PropertyKind};

/// Files and folders referenced by path properties must exist in the package
///
/// Only runs when the context knows the package directory. Lookups ignore
/// case, as installers are expected to.
pub struct MissingResourceRule;

impl LintRule for MissingResourceRule {
    fn name(&self) -> &'static str {
        "missing-resource"
    }

    fn description(&self) -> &'static str {
        "Warn about referenced files or folders that are not in the package"
    }

    fn check_node(&self, ctx: &LintContext, id: NodeId) -> Vec<Diagnostic> {
        let Some(root) = ctx.package_root else {
            return Vec::new();
        };

        let node = ctx.tree.node(id);
        let mut diagnostics = Vec::new();

        for def in node.descriptor().properties {
            let expects_dir = match def.kind {
                PropertyKind::File => false,
                PropertyKind::Folder => true,
                _ => continue,
            };
            let Some(value) = node.property(def.name).filter(|v| !v.trim().is_empty()) else {
                continue;
            };

            let found = resolve_in_package(ctx.fs, root, value)
                .filter(|path| ctx.fs.is_dir(path) == expects_dir);
            if found.is_none() {
                let what = if expects_dir { "Folder" } else { "File" };
                diagnostics.push(
                    Diagnostic::warning(
                        self.name(),
                        format!("{} '{}' does not exist in the package", what, value),
                        ctx.location(id),
                    )
                    .with_suggestion(format!("Check the {} path", def.display_name)),
                );
            }
        }

        diagnostics
    }
}
