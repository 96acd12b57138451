//! Basic file operations for workarea placement
//!
//! This module handles low-level file operations:
//! - Directory creation (ensure_parent_dir)
//! - Removing whatever occupies a destination (remove_existing)
//! - File and directory copies (copy_file, copy_dir_recursive)
//! - Symlink creation (link)

use std::fs;
use std::path::Path;

use walkdir::WalkDir;

use crate::error::{InstallerError, Result};

fn placement_error(path: &Path, e: std::io::Error) -> InstallerError {
    InstallerError::PlacementFailed {
        path: path.display().to_string(),
        reason: e.to_string(),
    }
}

/// Ensure parent directory exists for a path
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| placement_error(parent, e))?;
    }
    Ok(())
}

pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|e| placement_error(path, e))
}

/// Create an empty file, with its parent directories
pub fn touch(path: &Path) -> Result<()> {
    ensure_parent_dir(path)?;
    fs::File::create(path).map_err(|e| placement_error(path, e))?;
    Ok(())
}

/// Whether `path` is a symlink, dangling or not
pub fn is_symlink(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok_and(|m| m.file_type().is_symlink())
}

/// Whether anything, including a dangling symlink, sits at `path`
pub fn occupied(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Remove the file, symlink or directory tree at `path`, if any
pub fn remove_existing(path: &Path) -> Result<()> {
    let Ok(metadata) = fs::symlink_metadata(path) else {
        return Ok(());
    };
    let removed = if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    removed.map_err(|e| placement_error(path, e))
}

/// Copy one file, replacing a symlink at the destination instead of writing through it
pub fn copy_file(source: &Path, target: &Path) -> Result<()> {
    ensure_parent_dir(target)?;
    if is_symlink(target) {
        fs::remove_file(target).map_err(|e| placement_error(target, e))?;
    }
    fs::copy(source, target).map_err(|e| placement_error(target, e))?;
    Ok(())
}

/// Copy a directory tree
pub fn copy_dir_recursive(source: &Path, target: &Path) -> Result<()> {
    ensure_dir(target)?;

    for entry in WalkDir::new(source).follow_links(false).min_depth(1) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(source).to_path_buf();
            placement_error(&path, e.into())
        })?;
        let relative = entry.path().strip_prefix(source).unwrap_or(entry.path());
        let target_path = target.join(relative);

        let file_type = entry.file_type();
        if file_type.is_symlink() {
            copy_symlink(entry.path(), &target_path)?;
        } else if file_type.is_dir() {
            ensure_dir(&target_path)?;
        } else {
            fs::copy(entry.path(), &target_path).map_err(|e| placement_error(&target_path, e))?;
        }
    }

    Ok(())
}

/// Recreate the symlink at `source` as `target`, pointing where `source` points
fn copy_symlink(source: &Path, target: &Path) -> Result<()> {
    let points_to = fs::read_link(source).map_err(|e| placement_error(source, e))?;
    #[cfg(unix)]
    let created = std::os::unix::fs::symlink(&points_to, target);
    #[cfg(windows)]
    let created = if source.is_dir() {
        std::os::windows::fs::symlink_dir(&points_to, target)
    } else {
        std::os::windows::fs::symlink_file(&points_to, target)
    };
    created.map_err(|e| placement_error(target, e))
}

/// Symlink `target` to the canonical location of `source`
pub fn link(source: &Path, target: &Path) -> Result<()> {
    let source = dunce::canonicalize(source).map_err(|e| placement_error(source, e))?;
    ensure_parent_dir(target)?;
    symlink(&source, target).map_err(|e| placement_error(target, e))
}

#[cfg(unix)]
fn symlink(source: &Path, target: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(source, target)
}

#[cfg(windows)]
fn symlink(source: &Path, target: &Path) -> std::io::Result<()> {
    if source.is_dir() {
        std::os::windows::fs::symlink_dir(source, target)
    } else {
        std::os::windows::fs::symlink_file(source, target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_copy_dir_recursive() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("src");
        fs::create_dir_all(source.join("nested")).unwrap();
        fs::write(source.join("a.txt"), "a").unwrap();
        fs::write(source.join("nested/b.txt"), "b").unwrap();

        let target = temp.path().join("dst");
        copy_dir_recursive(&source, &target).unwrap();

        assert_eq!(fs::read_to_string(target.join("a.txt")).unwrap(), "a");
        assert_eq!(fs::read_to_string(target.join("nested/b.txt")).unwrap(), "b");
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_dir_recursive_keeps_symlinks() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("src");
        fs::create_dir_all(source.join("nested")).unwrap();
        fs::write(source.join("a.txt"), "a").unwrap();
        std::os::unix::fs::symlink("..", source.join("nested/loop")).unwrap();
        std::os::unix::fs::symlink("a.txt", source.join("alias.txt")).unwrap();

        let target = temp.path().join("dst");
        copy_dir_recursive(&source, &target).unwrap();

        assert!(is_symlink(&target.join("nested/loop")));
        assert_eq!(
            fs::read_link(target.join("nested/loop")).unwrap(),
            Path::new("..")
        );
        assert!(is_symlink(&target.join("alias.txt")));
        assert_eq!(fs::read_to_string(target.join("alias.txt")).unwrap(), "a");
    }

    #[test]
    fn test_remove_existing_handles_all_kinds() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("dir");
        fs::create_dir_all(dir.join("inner")).unwrap();
        let file = temp.path().join("file");
        fs::write(&file, "x").unwrap();

        remove_existing(&dir).unwrap();
        remove_existing(&file).unwrap();
        remove_existing(&temp.path().join("missing")).unwrap();

        assert!(!dir.exists());
        assert!(!file.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_file_replaces_symlink() {
        let temp = TempDir::new().unwrap();
        let original = temp.path().join("original.txt");
        fs::write(&original, "original").unwrap();
        let target = temp.path().join("target.txt");
        link(&original, &target).unwrap();

        let source = temp.path().join("source.txt");
        fs::write(&source, "copied").unwrap();
        copy_file(&source, &target).unwrap();

        assert!(!is_symlink(&target));
        assert_eq!(fs::read_to_string(&target).unwrap(), "copied");
        assert_eq!(fs::read_to_string(&original).unwrap(), "original");
    }

    #[cfg(unix)]
    #[test]
    fn test_link_points_at_canonical_source() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("src.txt");
        fs::write(&source, "x").unwrap();
        let target = temp.path().join("deep/dir/link.txt");

        link(&source, &target).unwrap();

        assert!(is_symlink(&target));
        assert_eq!(
            fs::read_link(&target).unwrap(),
            dunce::canonicalize(&source).unwrap()
        );
    }
}
