use super::package_dir;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use fomod_common::Settings;
use fomod_editor::EditSession;
use fomod_parser::{import_package, NodeKind, CONFIG_FILE, INFO_FILE, PACKAGE_FOLDER};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Package directory (created if missing)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Mod name written to both documents
    #[arg(short, long)]
    pub name: Option<String>,

    /// Author written to the metadata document
    #[arg(short, long)]
    pub author: Option<String>,

    /// Overwrite an existing installer
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &Path, settings: Settings) -> Result<()> {
    let dir = package_dir(cwd, &args.path);

    if dir.is_dir() && import_package(&dir).ok().flatten().is_some() && !args.force {
        println!(
            "{} {} already contains an installer",
            "⚠️".yellow(),
            dir.display().to_string().bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    println!("{}", "📝 Initializing installer package...".bright_blue().bold());

    if !dir.exists() {
        fs::create_dir_all(&dir)?;
        println!("  {} Created {}/", "✓".green(), dir.display());
    }

    let name = args.name.unwrap_or_else(|| default_name(&dir));

    let mut session = EditSession::new(settings);
    let info = session.document().info();
    let config = session.document().config();

    let info_name = session.add_child(info, NodeKind::Name)?;
    session.set_text(info_name, &name)?;
    if let Some(author) = &args.author {
        let info_author = session.add_child(info, NodeKind::Author)?;
        session.set_text(info_author, author)?;
    }
    let version = session.add_child(info, NodeKind::Version)?;
    session.set_text(version, "1.0.0")?;

    if let Some(module_name) = session.tree().children(config).first().copied() {
        session.set_text(module_name, &name)?;
    }

    session.save_as(&dir)?;

    println!("  {} Created {}/{}", "✓".green(), PACKAGE_FOLDER, INFO_FILE);
    println!("  {} Created {}/{}", "✓".green(), PACKAGE_FOLDER, CONFIG_FILE);
    println!();
    println!("{}", "✅ Package initialized!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Edit {}/{}", PACKAGE_FOLDER, CONFIG_FILE);
    println!("  2. Run: fomod check {}", args.path.display());

    Ok(())
}

/// Directory name, or a placeholder for unnamed paths
fn default_name(dir: &Path) -> String {
    dir.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty() && name != ".")
        .unwrap_or_else(|| "New Mod".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fomod_parser::import_package;

    #[test]
    fn test_init_writes_loadable_package() {
        let dir = tempfile::tempdir().unwrap();
        let args = InitArgs {
            path: PathBuf::from("MyMod"),
            name: None,
            author: Some("Someone".to_string()),
            force: false,
        };
        init(args, dir.path(), Settings::default()).unwrap();

        let package = import_package(&dir.path().join("MyMod")).unwrap().unwrap();
        let tree = &package.tree;
        let module_name = tree.children(package.config)[0];
        assert_eq!(tree.text(module_name), "MyMod");

        let info_children: Vec<NodeKind> =
            tree.children(package.info).iter().map(|id| tree.kind(*id)).collect();
        assert_eq!(info_children, vec![NodeKind::Name, NodeKind::Author, NodeKind::Version]);
    }

    #[test]
    fn test_init_keeps_existing_installer() {
        let dir = tempfile::tempdir().unwrap();
        let args = |name: &str| InitArgs {
            path: PathBuf::from("."),
            name: Some(name.to_string()),
            author: None,
            force: false,
        };
        init(args("First"), dir.path(), Settings::default()).unwrap();
        init(args("Second"), dir.path(), Settings::default()).unwrap();

        let package = import_package(dir.path()).unwrap().unwrap();
        let module_name = package.tree.children(package.config)[0];
        assert_eq!(package.tree.text(module_name), "First");
    }

    #[test]
    fn test_default_name() {
        assert_eq!(default_name(Path::new("/mods/Better Armor")), "Better Armor");
        assert_eq!(default_name(Path::new("/")), "New Mod");
    }
}
