//! Named assets bundled with the app.
//!
//! One process-wide [`AssetSource`] resolves logical names such as
//! `clouds.gif`. The desktop default searches `NIMBUS_ASSET_DIR`, then
//! `./assets`, then `assets/` next to the executable. Android installs a
//! source backed by the APK asset manager at startup.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::{MediaError, MediaUri};

pub const ASSET_DIR_ENV: &str = "NIMBUS_ASSET_DIR";

pub trait AssetSource: Send + Sync {
    fn read(&self, name: &str) -> Result<Vec<u8>, MediaError>;
}

/// Names are relative paths without `..`.
pub fn validate_asset_name(name: &str) -> Result<(), MediaError> {
    let p = Path::new(name);
    let ok = !name.is_empty()
        && p.components().all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if ok {
        Ok(())
    } else {
        Err(MediaError::InvalidUri(name.to_string()))
    }
}

/// Looks names up in a list of directories, first hit wins.
#[derive(Clone, Debug, Default)]
pub struct DirAssets {
    dirs: Vec<PathBuf>,
}

impl DirAssets {
    pub fn new(dirs: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            dirs: dirs.into_iter().collect(),
        }
    }

    pub fn from_env() -> Self {
        let mut dirs = Vec::new();
        if let Some(d) = std::env::var_os(ASSET_DIR_ENV) {
            dirs.push(PathBuf::from(d));
        }
        dirs.push(PathBuf::from("assets"));
        if let Some(exe_dir) = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(Path::to_path_buf))
        {
            dirs.push(exe_dir.join("assets"));
        }
        log::debug!("asset directories: {dirs:?}");
        Self { dirs }
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }
}

impl AssetSource for DirAssets {
    fn read(&self, name: &str) -> Result<Vec<u8>, MediaError> {
        validate_asset_name(name)?;
        for dir in &self.dirs {
            let path = dir.join(name);
            match std::fs::read(&path) {
                Ok(bytes) => return Ok(bytes),
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(source) => {
                    return Err(MediaError::Io {
                        path: path.display().to_string(),
                        source,
                    });
                }
            }
        }
        Err(MediaError::AssetNotFound(name.to_string()))
    }
}

/// In-memory assets, for tests and embedded resources.
#[derive(Clone, Debug, Default)]
pub struct MemoryAssets {
    files: HashMap<String, Arc<[u8]>>,
}

impl MemoryAssets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        self.insert(name, bytes);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) {
        self.files.insert(name.into(), bytes.into());
    }
}

impl AssetSource for MemoryAssets {
    fn read(&self, name: &str) -> Result<Vec<u8>, MediaError> {
        self.files
            .get(name)
            .map(|b| b.to_vec())
            .ok_or_else(|| MediaError::AssetNotFound(name.to_string()))
    }
}

static SOURCE: Lazy<RwLock<Arc<dyn AssetSource>>> =
    Lazy::new(|| RwLock::new(Arc::new(DirAssets::from_env())));

/// Replaces the process-wide asset source.
pub fn set_asset_source(source: impl AssetSource + 'static) {
    *SOURCE.write() = Arc::new(source);
}

pub fn asset_source() -> Arc<dyn AssetSource> {
    SOURCE.read().clone()
}

pub fn read_asset(name: &str) -> Result<Vec<u8>, MediaError> {
    asset_source().read(name)
}

/// Reads the bytes behind `uri`, resolving assets through `source`.
pub fn read_uri(uri: &MediaUri, source: &dyn AssetSource) -> Result<Vec<u8>, MediaError> {
    match uri {
        MediaUri::Asset(name) => source.read(name),
        MediaUri::File(path) => std::fs::read(path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                MediaError::AssetNotFound(path.display().to_string())
            } else {
                MediaError::Io {
                    path: path.display().to_string(),
                    source: e,
                }
            }
        }),
    }
}
