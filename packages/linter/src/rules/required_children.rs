use crate::diagnostic::Diagnostic;
use crate::rules::{LintContext, LintRule};
use fomod_parser::NodeId;

/// Every required child kind must be present
pub struct RequiredChildrenRule;

impl LintRule for RequiredChildrenRule {
    fn name(&self) -> &'static str {
        "required-children"
    }

    fn description(&self) -> &'static str {
        "Require the child elements a node cannot do without"
    }

    fn check_node(&self, ctx: &LintContext, id: NodeId) -> Vec<Diagnostic> {
        ctx.tree
            .missing_required_children(id)
            .into_iter()
            .map(|kind| {
                Diagnostic::error(
                    self.name(),
                    format!(
                        "{} requires a <{}> child",
                        ctx.tree.display_name(id),
                        kind.tag()
                    ),
                    ctx.location(id),
                )
                .with_suggestion(format!("Add a {} node", kind.display_name()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fomod_common::MockFileSystem;
    use fomod_parser::{NodeKind, Tree};

    #[test]
    fn test_reports_missing_child() {
        let mut tree = Tree::new();
        let plugin = tree.create(NodeKind::Plugin);
        let description = tree.create(NodeKind::PluginDescription);
        tree.add_child(plugin, description).unwrap();

        let fs = MockFileSystem::new();
        let ctx = LintContext::new(&tree, &fs);
        let diagnostics = RequiredChildrenRule.check_node(&ctx, plugin);

        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("<typeDescriptor>"));
        assert!(diagnostics[0].is_error());
    }

    #[test]
    fn test_leaf_has_nothing_to_report() {
        let mut tree = Tree::new();
        let file = tree.create(NodeKind::File);
        let fs = MockFileSystem::new();
        let ctx = LintContext::new(&tree, &fs);
        assert!(RequiredChildrenRule.check_node(&ctx, file).is_empty());
    }
}
