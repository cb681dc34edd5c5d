//! Run configuration, built once at startup.
//!
//! Mount file format (JSON, declaration order is the search order):
//!
//! ```json
//! {
//!     "hl2":   { "appid": 220, "mount": ["hl2", "hl2/hl2_textures.vpk"] },
//!     "local": { "path": "${fileDir}/..", "mount": ["custom"] }
//! }
//! ```

use crate::error::{AssetscopeError, Result};
use crate::install::default_steam_root;
use crate::mount::MountDescriptor;
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MountEntry {
    appid: Option<u32>,
    path: Option<String>,
    #[serde(default)]
    mount: Vec<String>,
}

/// Immutable configuration for one validation run.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub steam_root: Option<PathBuf>,
    pub mounts: Vec<MountDescriptor>,
}

impl Config {
    /// Mounts from `path_config` (if any) followed by one raw mount per
    /// search path. Without an explicit `steam_root` the platform default
    /// (or `ASSETSCOPE_STEAM_ROOT`) is used.
    pub fn load(
        path_config: Option<&Path>,
        search_paths: &[PathBuf],
        steam_root: Option<PathBuf>,
    ) -> Result<Self> {
        let mut mounts = match path_config {
            Some(path) => load_mount_config(path)?,
            None => Vec::new(),
        };
        mounts.extend(search_paths.iter().enumerate().map(|(i, dir)| {
            MountDescriptor::raw(format!("search-path:{i}"), dir.to_string_lossy())
        }));

        Ok(Self {
            steam_root: steam_root.or_else(default_steam_root),
            mounts,
        })
    }
}

pub fn load_mount_config(path: &Path) -> Result<Vec<MountDescriptor>> {
    let load = || -> Result<Vec<MountDescriptor>> {
        let text = std::fs::read_to_string(path)?;
        parse_mount_config(&text)
    };
    load().map_err(|source| AssetscopeError::MountConfig {
        path: path.to_path_buf(),
        source: Box::new(source),
    })
}

pub fn parse_mount_config(text: &str) -> Result<Vec<MountDescriptor>> {
    let entries: IndexMap<String, MountEntry> = serde_json::from_str(text)?;

    entries
        .into_iter()
        .map(|(name, entry)| {
            let descriptor = match (entry.appid, entry.path) {
                (Some(app_id), None) => MountDescriptor::app(name, app_id),
                (None, Some(path)) => MountDescriptor::raw(name, path),
                (Some(_), Some(_)) => {
                    return Err(AssetscopeError::InvalidMount {
                        mount: name,
                        reason: "sets both \"appid\" and \"path\"".to_string(),
                    });
                }
                (None, None) => {
                    return Err(AssetscopeError::InvalidMount {
                        mount: name,
                        reason: "needs either \"appid\" or \"path\"".to_string(),
                    });
                }
            };
            Ok(descriptor.with_submounts(entry.mount))
        })
        .collect()
}
