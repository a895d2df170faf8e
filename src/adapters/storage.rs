//! Output storage on the local filesystem.
//!
//! Every file is written to a temporary sibling first and renamed into place, so a
//! reader never sees a half-written report or registry.

use crate::core::Storage;
use crate::utils::error::{EtlError, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// `Path::parent` 對單純檔名回傳空字串，視為目前目錄
fn parent_dir_or_dot(path: &Path) -> &Path {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

/// Write `data` to `dest` atomically, creating missing parent directories.
pub fn write_atomic(dest: &Path, data: &[u8]) -> Result<()> {
    let dir = parent_dir_or_dot(dest);
    std::fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;

    tmp.persist(dest).map_err(|e| EtlError::IoError(e.error))?;
    Ok(())
}

/// Reports land under a single output directory.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, name: &str) -> Result<PathBuf> {
        let relative = Path::new(name);
        let escapes = relative.is_absolute()
            || relative
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir));
        if name.trim().is_empty() || escapes {
            return Err(EtlError::ValidationError {
                message: format!(
                    "Output name '{}' must stay inside {}",
                    name,
                    self.root.display()
                ),
            });
        }
        Ok(self.root.join(relative))
    }
}

impl Storage for LocalStorage {
    fn write_file(&self, name: &str, data: &[u8]) -> Result<()> {
        let path = self.resolve(name)?;
        tracing::debug!("Writing {} ({} bytes)", path.display(), data.len());
        write_atomic(&path, data)
    }

    fn location(&self, name: &str) -> String {
        self.root.join(name).display().to_string()
    }
}
