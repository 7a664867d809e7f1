use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::Result;

/// Directory that holds sample tables and figures.
///
/// File names are resolved to full paths against the directory, so the process
/// working directory is never read or changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TablesDir {
    root: PathBuf,
}

impl TablesDir {
    /// Uses `root` as the tables directory, creating it if it does not exist.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        debug!("using tables directory {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Full path of `file_name` inside the tables directory.
    pub fn path<P: AsRef<Path>>(&self, file_name: P) -> PathBuf {
        self.root.join(file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_nested_directory_and_resolves_names() {
        let tmp = tempfile::tempdir().unwrap();
        let cwd = std::env::current_dir().unwrap();

        let tables = TablesDir::open(tmp.path().join("out").join("tables")).unwrap();
        assert!(tables.root().is_dir());
        assert_eq!(
            tables.path("mcmc.csv"),
            tmp.path().join("out").join("tables").join("mcmc.csv")
        );
        assert_eq!(std::env::current_dir().unwrap(), cwd);
    }
}
