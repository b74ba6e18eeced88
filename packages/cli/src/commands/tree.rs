use super::{load_package, package_dir};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use fomod_parser::{NodeId, Tree};
use std::fmt::Write;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct TreeArgs {
    /// Package directory to print
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Print the metadata document instead of the configuration
    #[arg(short, long)]
    pub info: bool,

    /// Show sort keys next to each node
    #[arg(short, long)]
    pub keys: bool,
}

pub fn tree(args: TreeArgs, cwd: &Path) -> Result<()> {
    let dir = package_dir(cwd, &args.path);
    let package = load_package(&dir)?;
    let root = if args.info { package.info } else { package.config };

    print!("{}", render(&package.tree, root, args.keys));
    Ok(())
}

/// Indented outline of the subtree under `root`, in key order
pub fn render(tree: &Tree, root: NodeId, keys: bool) -> String {
    let mut out = String::new();
    render_node(tree, root, 0, keys, &mut out);
    out
}

fn render_node(tree: &Tree, id: NodeId, depth: usize, keys: bool, out: &mut String) {
    let _ = write!(out, "{}{}", "  ".repeat(depth), tree.display_name(id).bold());

    let text = tree.text(id);
    if !text.is_empty() {
        let _ = write!(out, " {}", format!("\"{}\"", text).dimmed());
    }
    if keys {
        if let Some(key) = tree.sort_key(id) {
            let _ = write!(out, " {}", format!("#{}", key).dimmed());
        }
    }
    out.push('\n');

    for child in tree.sorted_children(id) {
        render_node(tree, child, depth + 1, keys, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fomod_parser::{import_str, NodeKind};

    #[test]
    fn test_render_outline() {
        colored::control::set_override(false);

        let mut tree = Tree::new();
        let config = import_str(
            &mut tree,
            r#"<config>
                <moduleName>Mod</moduleName>
                <installSteps order="Explicit">
                    <installStep name="Main"/>
                </installSteps>
            </config>"#,
            NodeKind::Config,
        )
        .unwrap();

        let outline = render(&tree, config, false);
        assert_eq!(
            outline,
            "Config\n  Name \"Mod\"\n  Installation Steps\n    Installation Step: Main\n"
        );

        let keyed = render(&tree, config, true);
        assert!(keyed.contains("Name \"Mod\" #0000001"));
    }
}
