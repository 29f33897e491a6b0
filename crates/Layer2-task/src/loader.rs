//! Resource loader - resolves template and file names for actions

use crate::error::{TaskError, TaskResult};
use std::io;
use std::path::{Path, PathBuf};

/// Looks up named resources (templates, files) relative to a base directory
pub trait ResourceLoader: Send + Sync {
    fn base_dir(&self) -> &Path;

    /// Read a resource as text. Missing resources are `TaskError::ResourceNotFound`.
    fn read_resource(&self, name: &str) -> TaskResult<String>;
}

/// Filesystem loader rooted at a directory
#[derive(Debug, Clone)]
pub struct FsLoader {
    base_dir: PathBuf,
}

impl FsLoader {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Resolve `name` under the base directory; `None` if it escapes the base
    fn resolve(&self, name: &str) -> Option<PathBuf> {
        let candidate = Path::new(name);
        if candidate.is_absolute() {
            return None;
        }

        let base = self.base_dir.canonicalize().ok()?;
        let full = base.join(candidate).canonicalize().ok()?;
        full.starts_with(&base).then_some(full)
    }
}

impl ResourceLoader for FsLoader {
    fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn read_resource(&self, name: &str) -> TaskResult<String> {
        let path = self
            .resolve(name)
            .ok_or_else(|| TaskError::ResourceNotFound(name.to_string()))?;

        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(TaskError::ResourceNotFound(name.to_string()))
            }
            Err(e) => Err(TaskError::Other(
                anyhow::Error::new(e).context(format!("failed to read {}", path.display())),
            )),
        }
    }
}
