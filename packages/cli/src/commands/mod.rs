pub mod check;
pub mod format;
pub mod init;
pub mod tree;

pub use check::{check, CheckArgs};
pub use format::{format, FormatArgs};
pub use init::{init, InitArgs};
pub use tree::{tree, TreeArgs};

use anyhow::Result;
use fomod_parser::{import_package, Package};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Resolve a package argument against the working directory
pub(crate) fn package_dir(cwd: &Path, input: &Path) -> PathBuf {
    if input.is_absolute() {
        input.to_path_buf()
    } else {
        cwd.join(input)
    }
}

/// Import the package at `dir`, failing if it holds no installer
pub(crate) fn load_package(dir: &Path) -> Result<Package> {
    if !dir.is_dir() {
        return Err(anyhow::anyhow!("Package directory does not exist: {}", dir.display()));
    }
    debug!(path = %dir.display(), "Loading package");
    import_package(dir)?
        .ok_or_else(|| anyhow::anyhow!("No installer found in {}", dir.display()))
}
