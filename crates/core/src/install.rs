//! Steam install discovery.
//!
//! Finds where an app is installed from:
//! - `steamapps/libraryfolders.vdf` under the Steam root (library folders)
//! - `steamapps/appmanifest_<appid>.acf` in each library (install dir)

use crate::error::{AssetscopeError, Result};
use crate::keyvalues::{self, Block, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, OnceLock};
use tracing::{debug, info, warn};

pub const STEAM_ROOT_ENV: &str = "ASSETSCOPE_STEAM_ROOT";

/// Looks up the install directory of an app by id.
///
/// `Ok(None)` means the app is not installed; `Err` is reserved for
/// problems with the package manager metadata itself.
pub trait AppLocator {
    fn locate_app(&self, app_id: u32) -> Result<Option<PathBuf>>;
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LocatorStats {
    /// Lookups that touched the library folders on disk
    pub disk_lookups: usize,
    /// Lookups answered from the per-app cache
    pub cache_hits: usize,
}

#[derive(Default)]
struct LocatorState {
    apps: HashMap<u32, Option<PathBuf>>,
    stats: LocatorStats,
}

/// Steam library reader with a per-app memo.
pub struct InstallLocator {
    steam_root: Option<PathBuf>,
    libraries: OnceLock<std::result::Result<Vec<PathBuf>, String>>,
    state: Mutex<LocatorState>,
}

impl InstallLocator {
    /// Uses `steam_root` when given, otherwise the platform default.
    pub fn new(steam_root: Option<PathBuf>) -> Self {
        Self {
            steam_root: steam_root.or_else(default_steam_root),
            libraries: OnceLock::new(),
            state: Mutex::new(LocatorState::default()),
        }
    }

    pub fn steam_root(&self) -> Option<&Path> {
        self.steam_root.as_deref()
    }

    pub fn index_path(&self) -> Option<PathBuf> {
        self.steam_root
            .as_ref()
            .map(|root| root.join("steamapps").join("libraryfolders.vdf"))
    }

    /// Library folders in index order. The index is read once per locator.
    pub fn list_library_folders(&self) -> Result<Vec<PathBuf>> {
        let index = self.index_path();
        let cached = self.libraries.get_or_init(|| match &index {
            Some(path) => read_library_index(path),
            None => Err("no Steam installation directory could be determined".to_string()),
        });

        cached.clone().map_err(|reason| AssetscopeError::LibraryIndex {
            path: index.unwrap_or_else(|| PathBuf::from("libraryfolders.vdf")),
            reason,
        })
    }

    pub fn stats(&self) -> LocatorStats {
        self.lock().stats.clone()
    }

    fn lock(&self) -> MutexGuard<'_, LocatorState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The first library holding a readable manifest for `app_id` decides
    /// the result.
    fn search_libraries(&self, libraries: &[PathBuf], app_id: u32) -> Option<PathBuf> {
        let file_name = format!("appmanifest_{app_id}.acf");
        for library in libraries {
            let steamapps = library.join("steamapps");
            let manifest = steamapps.join(&file_name);
            if !manifest.is_file() {
                continue;
            }

            let text = match std::fs::read_to_string(&manifest) {
                Ok(text) => text,
                Err(e) => {
                    warn!("Skipping unreadable {}: {}", manifest.display(), e);
                    continue;
                }
            };
            let kv = match keyvalues::parse(&text) {
                Ok(kv) => kv,
                Err(e) => {
                    warn!("Skipping malformed {}: {}", manifest.display(), e);
                    continue;
                }
            };

            return match kv.find_text("installdir") {
                Some(dir) => Some(steamapps.join("common").join(dir)),
                None => {
                    warn!("{} has no installdir entry", manifest.display());
                    None
                }
            };
        }
        None
    }
}

impl AppLocator for InstallLocator {
    fn locate_app(&self, app_id: u32) -> Result<Option<PathBuf>> {
        {
            let mut state = self.lock();
            if let Some(hit) = state.apps.get(&app_id).cloned() {
                state.stats.cache_hits += 1;
                return Ok(hit);
            }
        }

        let libraries = self.list_library_folders()?;
        let found = self.search_libraries(&libraries, app_id);
        match &found {
            Some(path) => info!("Found app {} at {}", app_id, path.display()),
            None => debug!("App {} is not installed in any library", app_id),
        }

        let mut state = self.lock();
        state.stats.disk_lookups += 1;
        state.apps.insert(app_id, found.clone());
        Ok(found)
    }
}

fn read_library_index(path: &Path) -> std::result::Result<Vec<PathBuf>, String> {
    let text = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    let kv = keyvalues::parse(&text).map_err(|e| e.to_string())?;
    let steam_root = path
        .parent()
        .and_then(Path::parent)
        .unwrap_or_else(|| Path::new("."));
    let folders = library_paths(&kv, steam_root);
    debug!(
        "Read {} library folders from {}",
        folders.len(),
        path.display()
    );
    Ok(folders)
}

/// Extracts library folders from a parsed index.
///
/// Current indices give each numbered folder a block with a `"path"` entry.
/// Older ones map numbers straight to folder paths and leave the Steam root
/// implicit.
fn library_paths(kv: &Block, steam_root: &Path) -> Vec<PathBuf> {
    let numbered: Vec<&Value> = kv
        .pairs()
        .iter()
        .filter_map(|top| top.value.as_block())
        .flat_map(|block| block.pairs())
        .filter(|pair| pair.key.parse::<u32>().is_ok())
        .map(|pair| &pair.value)
        .collect();

    let legacy: Vec<PathBuf> = numbered
        .iter()
        .filter_map(|value| value.as_text())
        .map(PathBuf::from)
        .collect();
    if !legacy.is_empty() {
        return std::iter::once(steam_root.to_path_buf())
            .chain(legacy)
            .collect();
    }

    numbered
        .iter()
        .filter_map(|value| value.as_block())
        .filter_map(|folder| folder.get_text("path"))
        .map(PathBuf::from)
        .collect()
}

/// Steam root from `ASSETSCOPE_STEAM_ROOT`, else the usual per-OS location.
pub fn default_steam_root() -> Option<PathBuf> {
    if let Some(root) = std::env::var_os(STEAM_ROOT_ENV) {
        return Some(PathBuf::from(root));
    }

    #[cfg(target_os = "windows")]
    {
        return Some(PathBuf::from(r"C:\Program Files (x86)\Steam"));
    }

    #[cfg(target_os = "macos")]
    {
        return dirs::home_dir().map(|h| h.join("Library/Application Support/Steam"));
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        // Flatpak installs also create the ~/.steam symlink
        let home = dirs::home_dir()?;
        let symlinked = home.join(".steam/steam");
        if symlinked.exists() {
            return Some(symlinked);
        }
        Some(home.join(".local/share/Steam"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_manifest(library: &Path, app_id: u32, body: &str) {
        let steamapps = library.join("steamapps");
        fs::create_dir_all(&steamapps).unwrap();
        fs::write(steamapps.join(format!("appmanifest_{app_id}.acf")), body).unwrap();
    }

    fn write_index(steam_root: &Path, libraries: &[&Path]) {
        let mut body = String::from("\"libraryfolders\"\n{\n");
        for (i, lib) in libraries.iter().enumerate() {
            let escaped = lib.display().to_string().replace('\\', "\\\\");
            body.push_str(&format!(
                "  \"{i}\"\n  {{\n    \"path\" \"{escaped}\"\n    \"apps\" {{ \"220\" \"1234\" }}\n  }}\n"
            ));
        }
        body.push_str("}\n");
        let steamapps = steam_root.join("steamapps");
        fs::create_dir_all(&steamapps).unwrap();
        fs::write(steamapps.join("libraryfolders.vdf"), body).unwrap();
    }

    #[test]
    fn test_list_library_folders_in_order() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().join("steam");
        let lib_a = temp.path().join("lib_a");
        let lib_b = temp.path().join("lib_b");
        write_index(&root, &[&lib_a, &lib_b]);

        let locator = InstallLocator::new(Some(root));
        assert_eq!(locator.list_library_folders().unwrap(), vec![lib_a, lib_b]);
    }

    #[test]
    fn test_missing_index_is_configuration_error() {
        let temp = tempfile::tempdir().unwrap();
        let locator = InstallLocator::new(Some(temp.path().to_path_buf()));

        let err = locator.list_library_folders().unwrap_err();
        assert!(err.is_configuration());
        assert!(matches!(err, AssetscopeError::LibraryIndex { .. }));
        // Still an error, not a panic, on repeated calls
        assert!(locator.list_library_folders().is_err());
    }

    #[test]
    fn test_legacy_index_includes_steam_root() {
        let kv = keyvalues::parse(
            r#""LibraryFolders" { "TimeNextStatsReport" "1" "ContentStatsID" "-1" "1" "/mnt/games" }"#,
        )
        .unwrap();
        let folders = library_paths(&kv, Path::new("/home/u/.steam/steam"));
        assert_eq!(
            folders,
            vec![
                PathBuf::from("/home/u/.steam/steam"),
                PathBuf::from("/mnt/games")
            ]
        );
    }

    #[test]
    fn test_index_without_libraries_is_empty() {
        let kv = keyvalues::parse(r#""libraryfolders" { "contentstatsid" "-1" }"#).unwrap();
        assert!(library_paths(&kv, Path::new("/home/u/.steam/steam")).is_empty());

        let kv = keyvalues::parse(r#""libraryfolders" { }"#).unwrap();
        assert!(library_paths(&kv, Path::new("/home/u/.steam/steam")).is_empty());
    }

    #[test]
    fn test_locate_app_in_second_library() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().join("steam");
        let lib_a = temp.path().join("lib_a");
        let lib_b = temp.path().join("lib_b");
        write_index(&root, &[&lib_a, &lib_b]);
        write_manifest(
            &lib_b,
            220,
            "\"AppState\" { \"appid\" \"220\" \"installdir\" \"Half-Life 2\" }",
        );

        let locator = InstallLocator::new(Some(root));
        let found = locator.locate_app(220).unwrap();
        assert_eq!(found, Some(lib_b.join("steamapps/common/Half-Life 2")));
    }

    #[test]
    fn test_locate_absent_app_is_not_found() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().join("steam");
        let lib = temp.path().join("lib");
        write_index(&root, &[&lib]);

        let locator = InstallLocator::new(Some(root));
        assert_eq!(locator.locate_app(440).unwrap(), None);
    }

    #[test]
    fn test_manifest_without_installdir_is_not_found() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().join("steam");
        let lib = temp.path().join("lib");
        write_index(&root, &[&lib]);
        write_manifest(&lib, 620, "\"AppState\" { \"appid\" \"620\" }");

        let locator = InstallLocator::new(Some(root));
        assert_eq!(locator.locate_app(620).unwrap(), None);
    }

    #[test]
    fn test_malformed_manifest_is_skipped() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().join("steam");
        let lib_a = temp.path().join("lib_a");
        let lib_b = temp.path().join("lib_b");
        write_index(&root, &[&lib_a, &lib_b]);
        write_manifest(&lib_a, 240, "\"AppState\" { \"installdir\" ");
        write_manifest(&lib_b, 240, "\"AppState\" { \"installdir\" \"cstrike\" }");

        let locator = InstallLocator::new(Some(root));
        assert_eq!(
            locator.locate_app(240).unwrap(),
            Some(lib_b.join("steamapps/common/cstrike"))
        );
    }

    #[test]
    fn test_locate_app_is_memoized() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().join("steam");
        let lib = temp.path().join("lib");
        write_index(&root, &[&lib]);
        write_manifest(&lib, 220, "\"AppState\" { \"installdir\" \"hl2\" }");

        let locator = InstallLocator::new(Some(root));
        let first = locator.locate_app(220).unwrap();
        let second = locator.locate_app(220).unwrap();
        locator.locate_app(999).unwrap();
        locator.locate_app(999).unwrap();

        assert_eq!(first, second);
        assert_eq!(
            locator.stats(),
            LocatorStats {
                disk_lookups: 2,
                cache_hits: 2
            }
        );
    }
}
