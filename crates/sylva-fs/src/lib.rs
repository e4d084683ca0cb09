mod error;
mod staging;

pub use error::{FsError, Result, from_io};
pub use staging::StagingArea;

use std::path::Path;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

#[cfg(unix)]
const FINAL_MODE: u32 = 0o644;

#[derive(Clone, Copy, Debug)]
pub struct AtomicWriteOptions {
    #[cfg(unix)]
    permissions: u32,
    prefix:      &'static str,
    suffix:      &'static str,
}

impl Default for AtomicWriteOptions {
    fn default() -> Self { Self::new() }
}

impl AtomicWriteOptions {
    pub fn new() -> Self {
        Self {
            #[cfg(unix)]
            permissions: FINAL_MODE,
            prefix: ".",
            suffix: ".tmp",
        }
    }

    #[cfg(unix)]
    pub fn permissions(mut self, permissions: u32) -> Self {
        self.permissions = permissions;
        self
    }

    #[cfg(not(unix))]
    pub fn permissions(self, _permissions: u32) -> Self { self }

    pub fn prefix(mut self, prefix: &'static str) -> Self {
        self.prefix = prefix;
        self
    }

    pub fn suffix(mut self, suffix: &'static str) -> Self {
        self.suffix = suffix;
        self
    }

    #[cfg(unix)]
    fn into_permissions(self) -> Option<std::fs::Permissions> {
        Some(std::fs::Permissions::from_mode(self.permissions))
    }

    #[cfg(not(unix))]
    fn into_permissions(self) -> Option<std::fs::Permissions> { None }
}

/// Write `content` to `path` through a temporary sibling and a rename.
///
/// Readers never observe a half-written file; the parent directory must
/// already exist.
pub fn atomic_write(
    path: impl AsRef<Path>,
    content: &[u8],
    options: AtomicWriteOptions,
) -> Result<()> {
    let path = path.as_ref();
    let parent = path.parent().unwrap_or(Path::new(""));

    let file_name = path.file_name().unwrap_or_default().to_string_lossy();
    let tmp_name = format!("{}{}{}", options.prefix, file_name, options.suffix);
    let tmp_path = parent.join(tmp_name);

    std::fs::write(&tmp_path, content).map_err(from_io)?;

    if let Some(perms) = options.into_permissions() {
        std::fs::set_permissions(&tmp_path, perms).map_err(from_io)?;
    }

    std::fs::rename(&tmp_path, path).map_err(from_io)?;

    Ok(())
}

/// Move a completed staging file into its destination.
///
/// Staging space and the destination may live on different filesystems, so a
/// failed rename falls back to copy-then-delete. Destination parents are
/// created as needed and the result carries world-readable permissions on
/// unix; the destination is replaced only once the content is fully in
/// place.
pub async fn relocate(from: impl AsRef<Path>, to: impl AsRef<Path>) -> Result<()> {
    let from = from.as_ref();
    let to = to.as_ref();

    if to.is_dir() {
        return Err(FsError::IsADirectory);
    }
    if let Some(parent) = to.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            tokio::fs::create_dir_all(parent).await.map_err(from_io)?;
        }
    }

    if let Err(rename_err) = tokio::fs::rename(from, to).await {
        tracing::debug!(
            from = %from.display(),
            to = %to.display(),
            error = %rename_err,
            "rename failed, copying instead"
        );
        tokio::fs::copy(from, to).await.map_err(from_io)?;
        tokio::fs::remove_file(from).await.map_err(from_io)?;
    }

    #[cfg(unix)]
    {
        let perms = std::fs::Permissions::from_mode(FINAL_MODE);
        tokio::fs::set_permissions(to, perms).await.map_err(from_io)?;
    }

    Ok(())
}
