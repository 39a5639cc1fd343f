//! UI asset preparation.
//!
//! The asset stage verifies the configured public directory and mounts it
//! on the transport. The resulting handle is opaque to the rest of the
//! core: nothing downstream reads it, it is carried on the server state
//! for embedders and the status surface.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("asset directory not found: {}", .0.display())]
    Missing(PathBuf),

    #[error("asset path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
}

/// Opaque handle to the prepared UI assets.
#[derive(Debug, Clone)]
pub struct UiAssets {
    pub dir: PathBuf,
    pub mount: String,
}

/// Check the configured directory and produce the asset handle.
pub fn prepare(dir: PathBuf, mount: &str) -> Result<UiAssets, AssetError> {
    if !dir.exists() {
        return Err(AssetError::Missing(dir));
    }
    if !dir.is_dir() {
        return Err(AssetError::NotADirectory(dir));
    }
    Ok(UiAssets {
        dir,
        mount: mount.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_directory_is_an_error() {
        let err = prepare(PathBuf::from("/definitely/not/here"), "/ui").unwrap_err();
        assert!(matches!(err, AssetError::Missing(_)));
    }

    #[test]
    fn existing_directory_produces_a_handle() {
        let tmp = tempfile::tempdir().unwrap();
        let assets = prepare(tmp.path().to_path_buf(), "/ui").unwrap();
        assert_eq!(assets.mount, "/ui");
    }
}
