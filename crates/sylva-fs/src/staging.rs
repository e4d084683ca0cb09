use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use once_cell::sync::OnceCell;
use tempfile::TempDir;

use crate::{Result, from_io};

enum Root {
    Owned(TempDir),
    External(PathBuf),
}

impl Root {
    fn path(&self) -> &Path {
        match self {
            Root::Owned(dir) => dir.path(),
            Root::External(path) => path.as_path(),
        }
    }
}

/// Process-wide scratch space for in-progress downloads.
///
/// The backing directory is created on the first allocation; concurrent
/// first callers race on a single guarded init and all observe the same
/// path. Allocation only hands out unique paths — nothing exists on disk
/// until the caller opens the file.
///
/// Dropping the area removes the backing directory and anything still in
/// it, unless the area was pinned to an external directory with
/// [`StagingArea::in_dir`].
pub struct StagingArea {
    root: OnceCell<Root>,
    next_id: AtomicU64,
}

impl StagingArea {
    pub fn new() -> Self {
        Self {
            root: OnceCell::new(),
            next_id: AtomicU64::new(0),
        }
    }

    /// An area backed by an existing directory instead of a fresh temp dir.
    ///
    /// The directory is not removed on drop; its lifecycle belongs to the
    /// caller.
    pub fn in_dir(path: impl Into<PathBuf>) -> Self {
        let area = Self::new();
        let _ = area.root.set(Root::External(path.into()));
        area
    }

    /// Reserve a fresh staging path.
    pub fn alloc(&self) -> Result<PathBuf> {
        let root = self
            .root
            .get_or_try_init(|| tempfile::tempdir().map(Root::Owned).map_err(from_io))?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        Ok(root.path().join(format!("{id:x}")))
    }

    /// The backing directory, if it has been created yet.
    pub fn path(&self) -> Option<&Path> {
        self.root.get().map(Root::path)
    }
}

impl Default for StagingArea {
    fn default() -> Self { Self::new() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn alloc_is_lazy() {
        let area = StagingArea::new();
        assert!(area.path().is_none());
        let first = area.alloc().unwrap();
        assert!(area.path().is_some());
        assert!(first.starts_with(area.path().unwrap()));
    }

    #[test]
    fn alloc_hands_out_unique_paths_under_one_root() {
        let area = StagingArea::new();
        let a = area.alloc().unwrap();
        let b = area.alloc().unwrap();
        assert_ne!(a, b);
        assert_eq!(a.parent(), b.parent());
    }

    #[test]
    fn external_root_is_used_as_is() {
        let dir = tempdir().unwrap();
        let area = StagingArea::in_dir(dir.path());
        let path = area.alloc().unwrap();
        assert!(path.starts_with(dir.path()));
        drop(area);
        assert!(dir.path().exists());
    }

    #[test]
    fn owned_root_is_removed_on_drop() {
        let area = StagingArea::new();
        let root = area.alloc().unwrap().parent().unwrap().to_path_buf();
        assert!(root.exists());
        drop(area);
        assert!(!root.exists());
    }
}
