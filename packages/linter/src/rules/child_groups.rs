use crate::diagnostic::Diagnostic;
use crate::rules::{LintContext, LintRule};
use fomod_parser::{GroupViolation, NodeId, NodeKind};

/// Either-groups hold exactly one member and at-least-one groups are non-empty
pub struct ChildGroupsRule;

fn tags(group: &[NodeKind]) -> String {
    group
        .iter()
        .map(|kind| format!("<{}>", kind.tag()))
        .collect::<Vec<_>>()
        .join(" or ")
}

impl LintRule for ChildGroupsRule {
    fn name(&self) -> &'static str {
        "child-groups"
    }

    fn description(&self) -> &'static str {
        "Enforce either-groups and at-least-one groups of child elements"
    }

    fn check_node(&self, ctx: &LintContext, id: NodeId) -> Vec<Diagnostic> {
        let owner = ctx.tree.display_name(id);
        ctx.tree
            .unsatisfied_groups(id)
            .into_iter()
            .map(|violation| {
                let message = match violation {
                    GroupViolation::AtLeastOneMissing(group) => {
                        format!("{} needs at least one {} child", owner, tags(group))
                    }
                    GroupViolation::EitherMissing(group) => {
                        format!("{} needs exactly one of {}", owner, tags(group))
                    }
                    GroupViolation::EitherConflict(group) => {
                        format!("{} may hold only one of {}", owner, tags(group))
                    }
                };
                Diagnostic::error(self.name(), message, ctx.location(id))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fomod_common::MockFileSystem;
    use fomod_parser::Tree;

    #[test]
    fn test_empty_type_descriptor() {
        let mut tree = Tree::new();
        let descriptor = tree.create(NodeKind::TypeDescriptor);
        let fs = MockFileSystem::new();
        let ctx = LintContext::new(&tree, &fs);

        let diagnostics = ChildGroupsRule.check_node(&ctx, descriptor);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("exactly one of <dependencyType> or <type>"));
    }

    #[test]
    fn test_plugin_needs_files_or_flags() {
        let mut tree = Tree::new();
        let plugin = tree.create(NodeKind::Plugin);
        let fs = MockFileSystem::new();

        let ctx = LintContext::new(&tree, &fs);
        assert_eq!(ChildGroupsRule.check_node(&ctx, plugin).len(), 1);

        let flags = tree.create(NodeKind::ConditionFlags);
        tree.add_child(plugin, flags).unwrap();
        let ctx = LintContext::new(&tree, &fs);
        assert!(ChildGroupsRule.check_node(&ctx, plugin).is_empty());
    }
}
