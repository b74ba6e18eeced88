use super::{load_package, package_dir};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use fomod_common::{RealFileSystem, Settings};
use fomod_linter::{check_resources, validate, Diagnostic, DiagnosticLevel};
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Package directory to check
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: String,

    /// Fail on missing resources as well
    #[arg(short, long)]
    pub strict: bool,
}

/// Totals of one check run
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CheckSummary {
    pub errors: usize,
    pub warnings: usize,
}

impl CheckSummary {
    fn from_diagnostics(diagnostics: &[Diagnostic]) -> Self {
        let errors = diagnostics.iter().filter(|d| d.is_error()).count();
        Self {
            errors,
            warnings: diagnostics.len() - errors,
        }
    }

    /// True if the run should fail
    pub fn failed(&self, strict: bool) -> bool {
        self.errors > 0 || (strict && self.warnings > 0)
    }
}

pub fn check(args: CheckArgs, cwd: &Path, settings: Settings) -> Result<()> {
    let dir = package_dir(cwd, &args.path);
    let strict = args.strict || !settings.save.warn_ignore;
    let json = args.format == "json";

    if !json {
        println!("🔍 {} FOMOD Checker", "Starting".green().bold());
        println!("   Package: {}", dir.display());
        println!();
    }

    let diagnostics = collect_diagnostics(&dir)?;
    let summary = CheckSummary::from_diagnostics(&diagnostics);

    if json {
        println!("{}", serde_json::to_string_pretty(&diagnostics)?);
    } else {
        print_diagnostics(&diagnostics);
        print_summary(&summary);
    }

    if summary.failed(strict) {
        return Err(anyhow::anyhow!(
            "Check failed with {} error(s) and {} warning(s)",
            summary.errors,
            summary.warnings
        ));
    }

    Ok(())
}

/// Schema errors followed by missing resource warnings for both documents
pub fn collect_diagnostics(dir: &Path) -> Result<Vec<Diagnostic>> {
    let package = load_package(dir)?;
    let fs = RealFileSystem;

    let mut diagnostics = Vec::new();
    for root in package.roots() {
        diagnostics.extend(validate(&package.tree, root, &fs));
    }
    for root in package.roots() {
        diagnostics.extend(check_resources(&package.tree, root, dir, &fs));
    }
    Ok(diagnostics)
}

fn print_diagnostics(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        let level = match diagnostic.level {
            DiagnosticLevel::Error => "error".red().bold(),
            DiagnosticLevel::Warning => "warning".yellow().bold(),
            DiagnosticLevel::Info => "info".blue().bold(),
        };

        println!("  {} [{}] {}", level, diagnostic.rule, diagnostic.message);
        println!("    {} {}", "at".dimmed(), diagnostic.location.path.dimmed());

        if let Some(suggestion) = &diagnostic.suggestion {
            println!("    {} {}", "💡".dimmed(), suggestion.dimmed());
        }
    }
    if !diagnostics.is_empty() {
        println!();
    }
}

fn print_summary(summary: &CheckSummary) {
    println!(
        "✨ {} Check complete!",
        if summary.errors > 0 {
            "Done".red().bold()
        } else {
            "Done".green().bold()
        }
    );

    if summary.errors > 0 {
        println!("   {} {}", "Errors:".red(), summary.errors);
    }
    if summary.warnings > 0 {
        println!("   {} {}", "Warnings:".yellow(), summary.warnings);
    }
    if summary.errors == 0 && summary.warnings == 0 {
        println!("   {} No issues found!", "✓".green());
    }
}
