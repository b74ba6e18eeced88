mod diagnostic;
mod linter;
mod rules;

pub use diagnostic::{Diagnostic, DiagnosticLevel, Location};
pub use linter::{check_resources, lint_document, validate, LintOptions};
pub use rules::{
    ChildGroupsRule, LintContext, LintRule, MissingResourceRule, PropertyValuesRule,
    RequiredChildrenRule, RuleRegistry,
};
