use super::{load_package, package_dir};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use fomod_common::{find_entry, RealFileSystem};
use fomod_parser::{export, export_package, Package, CONFIG_FILE, INFO_FILE, PACKAGE_FOLDER};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct FormatArgs {
    /// Package directory to format
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Only report whether the package is already formatted
    #[arg(short, long)]
    pub check: bool,
}

pub fn format(args: FormatArgs, cwd: &Path) -> Result<()> {
    let dir = package_dir(cwd, &args.path);
    let mut package = load_package(&dir)?;

    for root in package.roots() {
        package.tree.sort_recursive(root);
    }

    let stale = stale_documents(&package, &dir);
    if stale.is_empty() {
        println!("{} {} is already formatted", "✓".green(), dir.display());
        return Ok(());
    }

    if args.check {
        for name in &stale {
            println!("  {} {}/{}", "✗".red(), PACKAGE_FOLDER, name);
        }
        return Err(anyhow::anyhow!("{} document(s) need formatting", stale.len()));
    }

    export_package(&package, &dir)?;
    for name in &stale {
        println!("  {} Formatted {}/{}", "✓".green(), PACKAGE_FOLDER, name);
    }
    Ok(())
}

/// Names of the documents whose file content differs from the export
fn stale_documents(package: &Package, dir: &Path) -> Vec<&'static str> {
    let real = RealFileSystem;
    let (info, config) = export(package);
    let folder = find_entry(&real, dir, PACKAGE_FOLDER);

    [(INFO_FILE, info), (CONFIG_FILE, config)]
        .into_iter()
        .filter(|(name, expected)| {
            let current = folder
                .as_ref()
                .and_then(|folder| find_entry(&real, folder, name))
                .and_then(|path| fs::read_to_string(path).ok());
            current.as_deref() != Some(expected.as_str())
        })
        .map(|(name, _)| name)
        .collect()
}
