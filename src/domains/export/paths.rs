use std::io;
use std::path::{Path, PathBuf};

use crate::types::EntityKind;

pub const FILES_DIR: &str = "files";
pub const FOLDERS_DIR: &str = "folders";

/// Type-partitioned layout under one output root
#[derive(Debug, Clone)]
pub struct JsonPaths {
    root: PathBuf,
}

impl JsonPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Every directory the export owns, entity types first
    pub fn dir_names() -> impl Iterator<Item = &'static str> {
        EntityKind::EXPORT_ORDER
            .iter()
            .map(|k| k.plural())
            .chain([FILES_DIR, FOLDERS_DIR])
    }

    pub fn dirs(&self) -> Vec<PathBuf> {
        Self::dir_names().map(|d| self.root.join(d)).collect()
    }

    pub fn kind_dir(&self, kind: EntityKind) -> PathBuf {
        self.root.join(kind.plural())
    }

    pub fn files_dir(&self) -> PathBuf {
        self.root.join(FILES_DIR)
    }

    pub fn folders_dir(&self) -> PathBuf {
        self.root.join(FOLDERS_DIR)
    }

    /// Remove the owned directories. Anything else under the root is left alone.
    pub fn empty_dirs(&self) -> io::Result<()> {
        for dir in self.dirs() {
            match std::fs::remove_dir_all(&dir) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    pub fn ensure_dirs(&self) -> io::Result<()> {
        for dir in self.dirs() {
            std::fs::create_dir_all(&dir)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_then_ensure() {
        let root = tempfile::tempdir().unwrap();
        let paths = JsonPaths::new(root.path());
        paths.ensure_dirs().unwrap();

        let stale = paths.kind_dir(EntityKind::Scene).join("old.json");
        std::fs::write(&stale, "{}").unwrap();
        let unrelated = root.path().join("keep.txt");
        std::fs::write(&unrelated, "x").unwrap();

        paths.empty_dirs().unwrap();
        paths.ensure_dirs().unwrap();

        assert!(!stale.exists());
        assert!(unrelated.exists());
        assert_eq!(paths.dirs().len(), 9);
        assert!(paths.dirs().iter().all(|d| d.is_dir()));
    }
}
