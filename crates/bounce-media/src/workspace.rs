//! Scoped temporary workspace for intermediate files.

use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

const WORKSPACE_PREFIX: &str = "bounce_";

/// Temporary directory owned by one pipeline run.
///
/// Removed when dropped, on success and on every error path, unless
/// [`Workspace::keep`] is called.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Create a workspace under the system temp directory.
    pub fn new() -> io::Result<Self> {
        let dir = tempfile::Builder::new().prefix(WORKSPACE_PREFIX).tempdir()?;
        debug!(path = %dir.path().display(), "Created workspace");
        Ok(Self { dir })
    }

    /// Create a workspace under `parent`.
    pub fn new_in(parent: impl AsRef<Path>) -> io::Result<Self> {
        let parent = parent.as_ref();
        std::fs::create_dir_all(parent)?;
        let dir = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir_in(parent)?;
        debug!(path = %dir.path().display(), "Created workspace");
        Ok(Self { dir })
    }

    /// Workspace root.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path of a file inside the workspace.
    pub fn file(&self, name: impl AsRef<Path>) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Disable cleanup and return the directory path.
    pub fn keep(self) -> PathBuf {
        self.dir.keep()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_removed_on_drop() {
        let parent = tempfile::tempdir().unwrap();
        let root = {
            let workspace = Workspace::new_in(parent.path()).unwrap();
            std::fs::write(workspace.file("plan.txt"), "0 1\n").unwrap();
            assert!(workspace.file("plan.txt").exists());
            workspace.path().to_path_buf()
        };
        assert!(!root.exists());
    }

    #[test]
    fn test_keep_leaves_directory() {
        let parent = tempfile::tempdir().unwrap();
        let workspace = Workspace::new_in(parent.path()).unwrap();
        let kept = workspace.keep();
        assert!(kept.is_dir());
        assert!(kept
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(WORKSPACE_PREFIX));
    }
}
