//! Staging area: materializes in-memory source text as files the engine can
//! read by path.
//!
//! One fixed root per worker. Files are overwritten in place and never
//! cleaned up; checks are serialized, so writes never interleave.

use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone)]
pub struct StagingArea {
    root: PathBuf,
}

impl StagingArea {
    /// `root` is made absolute against the current directory; it is created
    /// lazily on the first `stage`.
    pub fn new(root: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self {
            root: std::path::absolute(root.as_ref())?,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `code` to `root/filename` (creating `root/cache_dir` first when
    /// given) and return the absolute path of the staged file.
    pub fn stage(&self, filename: &str, code: &str, cache_dir: Option<&str>) -> EngineResult<PathBuf> {
        validate_filename(filename)?;
        let cache_path = cache_dir
            .map(|dir| resolve_cache_dir(&self.root, dir))
            .transpose()?;

        create_dir(&self.root)?;
        if let Some(cache_path) = cache_path {
            create_dir(&cache_path)?;
        }

        let path = self.root.join(filename);
        std::fs::write(&path, code).map_err(|source| EngineError::Staging {
            path: path.clone(),
            source,
        })?;
        debug!("Staged {} ({} bytes)", path.display(), code.len());
        Ok(path)
    }
}

fn create_dir(path: &Path) -> EngineResult<()> {
    std::fs::create_dir_all(path).map_err(|source| EngineError::Staging {
        path: path.to_path_buf(),
        source,
    })
}

/// A filename is exactly one normal path component.
fn validate_filename(filename: &str) -> EngineResult<()> {
    let invalid = || EngineError::InvalidFilename(filename.to_string());
    if filename.is_empty() || filename.contains('/') || filename.contains('\\') {
        return Err(invalid());
    }
    let mut components = Path::new(filename).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(invalid()),
    }
}

/// Cache dirs may be nested but must stay below the staging root.
fn resolve_cache_dir(root: &Path, dir: &str) -> EngineResult<PathBuf> {
    let invalid = || EngineError::InvalidCacheDir(dir.to_string());
    if dir.trim().is_empty() {
        return Err(invalid());
    }
    let relative = Path::new(dir);
    let mut has_normal = false;
    for component in relative.components() {
        match component {
            Component::Normal(_) => has_normal = true,
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return Err(invalid()),
        }
    }
    if !has_normal {
        return Err(invalid());
    }
    Ok(root.join(relative))
}
