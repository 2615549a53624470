use crate::error_handling::types::BuildError;
use log::debug;
use std::path::{Path, PathBuf};

pub const DEFAULT_DESCRIPTOR_NAMES: [&str; 2] = ["docker-compose.yml", "docker-compose.yaml"];

/// Collects every file below `root` whose name is one of `names`.
///
/// Symbolic links to directories are not followed. The result is sorted so
/// builds always happen in the same order.
pub fn discover_descriptors<S: AsRef<str>>(
    root: &Path,
    names: &[S],
) -> Result<Vec<PathBuf>, BuildError> {
    if !root.is_dir() {
        return Err(BuildError::RootNotFound(root.to_path_buf()));
    }

    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let entries =
            std::fs::read_dir(&dir).map_err(|e| BuildError::WalkFailed(dir.clone(), e))?;

        for entry in entries {
            let entry = entry.map_err(|e| BuildError::WalkFailed(dir.clone(), e))?;
            let file_type = entry
                .file_type()
                .map_err(|e| BuildError::WalkFailed(entry.path(), e))?;
            let path = entry.path();

            if file_type.is_dir() {
                pending.push(path);
            } else if is_descriptor(&path, names) {
                debug!("Found build descriptor {}", path.display());
                found.push(path);
            }
        }
    }

    found.sort();
    Ok(found)
}

fn is_descriptor<S: AsRef<str>>(path: &Path, names: &[S]) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| names.iter().any(|candidate| candidate.as_ref() == name))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(root: &Path, relative: &str) -> PathBuf {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "services: {}\n").unwrap();
        path
    }

    #[test]
    fn test_finds_nested_descriptors_sorted() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let b = touch(root, "scraps/docker-compose.yaml");
        let a = touch(root, "middle/docker-compose.yml");
        let deep = touch(root, "middle/sub/docker-compose.yml");
        touch(root, "middle/Dockerfile");
        touch(root, "notes/compose.yml");

        let found = discover_descriptors(root, &DEFAULT_DESCRIPTOR_NAMES).unwrap();

        assert_eq!(found, vec![a, deep, b]);
    }

    #[test]
    fn test_custom_names() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(root, "middle/docker-compose.yml");
        let custom = touch(root, "middle/compose.yml");

        let found = discover_descriptors(root, &["compose.yml".to_string()]).unwrap();

        assert_eq!(found, vec![custom]);
    }

    #[test]
    fn test_empty_root() {
        let dir = TempDir::new().unwrap();
        let found = discover_descriptors(dir.path(), &DEFAULT_DESCRIPTOR_NAMES).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_missing_root() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("challenges");
        let err = discover_descriptors(&missing, &DEFAULT_DESCRIPTOR_NAMES).unwrap_err();
        assert!(matches!(err, BuildError::RootNotFound(p) if p == missing));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_directories_not_followed() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("challenges");
        let real = touch(&root, "middle/docker-compose.yml");
        let outside = touch(dir.path(), "outside/docker-compose.yml");
        std::os::unix::fs::symlink(outside.parent().unwrap(), root.join("linked")).unwrap();

        let found = discover_descriptors(&root, &DEFAULT_DESCRIPTOR_NAMES).unwrap();

        assert_eq!(found, vec![real]);
    }
}
