use crate::diagnostic::Diagnostic;
use crate::rules::{LintContext, LintRule};
use fomod_parser::NodeId;

/// Required properties are set and typed properties hold valid values
pub struct PropertyValuesRule;

impl LintRule for PropertyValuesRule {
    fn name(&self) -> &'static str {
        "property-values"
    }

    fn description(&self) -> &'static str {
        "Check required attributes and attribute value types"
    }

    fn check_node(&self, ctx: &LintContext, id: NodeId) -> Vec<Diagnostic> {
        let node = ctx.tree.node(id);
        let mut diagnostics = Vec::new();

        for def in node.descriptor().properties {
            match node.property(def.name) {
                None | Some("") if def.required && def.default != Some("") => {
                    diagnostics.push(
                        Diagnostic::error(
                            self.name(),
                            format!("Missing required attribute '{}'", def.name),
                            ctx.location(id),
                        )
                        .with_suggestion(format!("Set {}", def.display_name)),
                    );
                }
                None | Some("") => {}
                Some(raw) => {
                    if let Err(reason) = def.parse(raw) {
                        diagnostics.push(Diagnostic::error(
                            self.name(),
                            format!("Invalid value for '{}': {}", def.name, reason),
                            ctx.location(id),
                        ));
                    }
                }
            }
        }

        diagnostics
    }
}
