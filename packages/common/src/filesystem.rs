use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

/// File system abstraction for package lookup and resource checks
///
/// Installer packages are usually authored on Windows, so every lookup made
/// through this trait is expected to tolerate differences in letter case.
pub trait FileSystem {
    /// Check if a file or directory exists
    fn exists(&self, path: &Path) -> bool;

    /// Check if the path is a directory
    fn is_dir(&self, path: &Path) -> bool;

    /// Names of the immediate entries of a directory
    fn entries(&self, dir: &Path) -> Result<Vec<String>, std::io::Error>;
}

/// Real file system implementation
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn entries(&self, dir: &Path) -> Result<Vec<String>, std::io::Error> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }
}

/// Mock file system for testing
pub struct MockFileSystem {
    pub existing_files: BTreeSet<PathBuf>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self {
            existing_files: BTreeSet::new(),
        }
    }

    pub fn add_file(&mut self, path: impl Into<PathBuf>) {
        self.existing_files.insert(path.into());
    }

    fn directories(&self) -> BTreeSet<PathBuf> {
        self.existing_files
            .iter()
            .flat_map(|file| file.ancestors().skip(1))
            .map(Path::to_path_buf)
            .collect()
    }
}

impl Default for MockFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSystem for MockFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.existing_files.contains(path) || self.is_dir(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.directories().contains(path)
    }

    fn entries(&self, dir: &Path) -> Result<Vec<String>, std::io::Error> {
        if !self.is_dir(dir) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} is not a directory", dir.display()),
            ));
        }

        let names: BTreeSet<String> = self
            .existing_files
            .iter()
            .cloned()
            .chain(self.directories())
            .filter(|path| path.parent() == Some(dir))
            .filter_map(|path| path.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect();

        Ok(names.into_iter().collect())
    }
}

/// Find an entry of `dir` whose name matches `name` ignoring case
///
/// An exact match wins over a case-insensitive one.
pub fn find_entry(fs: &dyn FileSystem, dir: &Path, name: &str) -> Option<PathBuf> {
    let entries = fs.entries(dir).ok()?;

    if entries.iter().any(|entry| entry == name) {
        return Some(dir.join(name));
    }

    entries
        .iter()
        .find(|entry| entry.eq_ignore_ascii_case(name))
        .map(|entry| dir.join(entry))
}

/// Resolve a package-relative resource path ignoring case
///
/// Both `/` and `\` are accepted as separators. Paths escaping the root
/// (absolute paths or `..` components) never resolve.
pub fn resolve_in_package(fs: &dyn FileSystem, root: &Path, relative: &str) -> Option<PathBuf> {
    let normalized = relative.replace('\\', "/");
    let relative_path = Path::new(normalized.trim());

    let mut current = root.to_path_buf();
    for component in relative_path.components() {
        match component {
            Component::Normal(part) => {
                current = find_entry(fs, &current, &part.to_string_lossy())?;
            }
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    if current == root || !fs.exists(&current) {
        return None;
    }

    Some(current)
}
