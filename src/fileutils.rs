use crate::error::{Error, Result};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// ! Create a directory and its parents if missing
pub fn mkdir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path).map_err(|e| Error::io(path, e))?;
    }
    Ok(())
}

pub fn canonicalize(path: &Path) -> Result<PathBuf> {
    fs::canonicalize(path).map_err(|e| Error::io(path, e))
}

/// ! Write `content` to `path` unless the file already holds exactly that.
/// Returns whether the file was written.
pub fn write_if_changed(path: &Path, content: &str, force: bool) -> Result<bool> {
    if !force {
        if let Ok(existing) = fs::read(path) {
            if existing == content.as_bytes() {
                debug!("unchanged {}", path.display());
                return Ok(false);
            }
        }
    }
    if let Some(parent) = path.parent() {
        mkdir(parent)?;
    }
    fs::write(path, content).map_err(|e| Error::io(path, e))?;
    Ok(true)
}

/// ! `path` expressed relative to `base`. Both are expected to be absolute
/// or both relative; mismatched roots give `path` back unchanged.
pub fn relative_path(path: &Path, base: &Path) -> PathBuf {
    let path_parts: Vec<Component> = path.components().collect();
    let base_parts: Vec<Component> = base.components().collect();
    if path_parts.first() != base_parts.first() && (path.is_absolute() || base.is_absolute()) {
        return path.to_path_buf();
    }
    let common = path_parts
        .iter()
        .zip(&base_parts)
        .take_while(|(a, b)| a == b)
        .count();
    let mut relative = PathBuf::new();
    for _ in common..base_parts.len() {
        relative.push("..");
    }
    for part in &path_parts[common..] {
        relative.push(part);
    }
    if relative.as_os_str().is_empty() {
        relative.push(".");
    }
    relative
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths() {
        assert_eq!(
            relative_path(Path::new("/a/b/c/d.cpp"), Path::new("/a/b")),
            PathBuf::from("c/d.cpp")
        );
        assert_eq!(
            relative_path(Path::new("/a/src/x.cpp"), Path::new("/a/build/projects")),
            PathBuf::from("../../src/x.cpp")
        );
        assert_eq!(relative_path(Path::new("/a"), Path::new("/a")), PathBuf::from("."));
    }

    #[test]
    fn writes_only_when_content_differs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.ninja");
        assert!(write_if_changed(&path, "a", false).unwrap());
        assert!(!write_if_changed(&path, "a", false).unwrap());
        assert!(write_if_changed(&path, "a", true).unwrap());
        assert!(write_if_changed(&path, "b", false).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "b");
    }
}
