//! Build file discovery.

use std::path::{Path, PathBuf};

use miette::{Result, miette};
use rivet_core::BUILD_FILE_NAME;

/// Finds the build file by searching from the current directory upwards.
pub fn find_build_file() -> Result<PathBuf> {
    find_build_file_from(
        &std::env::current_dir().map_err(|e| miette!("Cannot get current directory: {}", e))?,
    )
}

/// Finds the build file starting from the given directory.
pub fn find_build_file_from(start: &Path) -> Result<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let candidate = current.join(BUILD_FILE_NAME);
        if candidate.is_file() {
            return Ok(candidate);
        }

        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => {
                return Err(miette!(
                    "{} not found in {} or any parent directory",
                    BUILD_FILE_NAME,
                    start.display()
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_find_build_file_in_current() {
        let dir = tempdir().unwrap();
        let file = dir.path().join(BUILD_FILE_NAME);
        fs::write(&file, "{}").unwrap();

        assert_eq!(find_build_file_from(dir.path()).unwrap(), file);
    }

    #[test]
    fn test_find_build_file_in_parent() {
        let dir = tempdir().unwrap();
        let file = dir.path().join(BUILD_FILE_NAME);
        fs::write(&file, "{}").unwrap();

        let nested = dir.path().join("target").join("classes");
        fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_build_file_from(&nested).unwrap(), file);
    }

    #[test]
    fn test_directory_named_like_build_file_is_skipped() {
        let dir = tempdir().unwrap();
        let file = dir.path().join(BUILD_FILE_NAME);
        fs::write(&file, "{}").unwrap();

        let nested = dir.path().join("module");
        fs::create_dir_all(nested.join(BUILD_FILE_NAME)).unwrap();

        assert_eq!(find_build_file_from(&nested).unwrap(), file);
    }

    #[test]
    fn test_find_build_file_not_found() {
        let result = find_build_file_from(Path::new("/"));
        assert!(result.is_err());
    }
}
