//! Units read from and written back to a folder.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rivet_core::TypeName;
use walkdir::WalkDir;

/// A class file below the source root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// The type named by the file's location.
    pub name: TypeName,

    /// Path relative to the root, with `/` separators.
    pub relative: String,

    /// Absolute path of the file.
    pub path: PathBuf,
}

impl Element {
    /// Reads the file.
    pub fn read(&self) -> io::Result<Vec<u8>> {
        fs::read(&self.path)
    }
}

/// Enumerates the class files below a folder.
#[derive(Debug, Clone)]
pub struct FolderSource {
    root: PathBuf,
}

impl FolderSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lists every class file below the root in path order.
    pub fn elements(&self) -> io::Result<Vec<Element>> {
        let mut elements = Vec::new();
        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = entry.map_err(io::Error::from)?;
            if !entry.file_type().is_file()
                || entry.path().extension().is_none_or(|ext| ext != "class")
            {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(&self.root)
                .map_err(io::Error::other)?
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            let Some(name) = TypeName::from_resource_path(&relative) else {
                continue;
            };

            elements.push(Element {
                name,
                relative,
                path: entry.into_path(),
            });
        }
        Ok(elements)
    }
}

/// Stores transformed units below a folder.
#[derive(Debug, Clone)]
pub struct FolderTarget {
    root: PathBuf,
}

impl FolderTarget {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes a unit, creating missing directories. Returns the written path.
    pub fn store(&self, relative: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, bytes)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_elements_lists_class_files_in_order() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("b")).unwrap();
        fs::create_dir_all(dir.path().join("a")).unwrap();
        fs::write(dir.path().join("b/Second.class"), b"").unwrap();
        fs::write(dir.path().join("a/First.class"), b"").unwrap();
        fs::write(dir.path().join("a/notes.txt"), b"").unwrap();

        let elements = FolderSource::new(dir.path()).elements().unwrap();
        let names: Vec<_> = elements.iter().map(|e| e.name.as_str()).collect();

        assert_eq!(names, vec!["a.First", "b.Second"]);
        assert_eq!(elements[0].relative, "a/First.class");
    }

    #[test]
    fn test_store_creates_directories() {
        let dir = tempdir().unwrap();
        let target = FolderTarget::new(dir.path());

        let path = target.store("x/y/Z.class", b"bytes").unwrap();
        assert_eq!(fs::read(path).unwrap(), b"bytes");
    }
}
