//! Read-only layered view over the mounted content sources.
//!
//! Each mount root becomes one [`Backend`]. Lookups walk the backends in
//! mount order and stop at the first match. Every backend indexes its
//! content once, case-folded, when it is mounted, so a lookup is a hash
//! lookup and no file handle outlives construction.

mod index;
mod raw;
mod vpk;
mod zip_package;

pub use index::{PathIndex, fold_case, normalize};
pub use raw::RawDirectory;
pub use vpk::{VPK_SIGNATURE, VpkArchive, VpkError};
pub use zip_package::ZipPackage;

use crate::config::Config;
use crate::error::Result;
use crate::install::InstallLocator;
use crate::mount::{MountResolver, MountRoot};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub enum Backend {
    RawDirectory(RawDirectory),
    Archive(VpkArchive),
    Zip(ZipPackage),
    /// A root that could not be read; it never matches and lists nothing.
    Unavailable { root: PathBuf, reason: String },
}

impl Backend {
    /// Picks the backend kind from what is on disk at `root`.
    ///
    /// Failures are not propagated: they produce [`Backend::Unavailable`].
    pub fn open(root: &Path) -> Self {
        let root = vpk_directory_file(root);
        let metadata = match std::fs::metadata(&root) {
            Ok(metadata) => metadata,
            Err(e) => return Self::unavailable(&root, e.to_string()),
        };
        if metadata.is_dir() {
            return Backend::RawDirectory(RawDirectory::index(&root));
        }

        let mut magic = [0u8; 4];
        let sniffed = File::open(&root).and_then(|mut file| file.read_exact(&mut magic));
        if let Err(e) = sniffed {
            return Self::unavailable(&root, e.to_string());
        }

        match magic {
            m if u32::from_le_bytes(m) == VPK_SIGNATURE => match VpkArchive::open(&root) {
                Ok(archive) => Backend::Archive(archive),
                Err(e) => Self::unavailable(&root, format!("unreadable VPK: {e}")),
            },
            // PK\x03\x04, PK\x05\x06 (empty) or PK\x07\x08 (spanned)
            [0x50, 0x4B, _, _] => match ZipPackage::open(&root) {
                Ok(package) => Backend::Zip(package),
                Err(e) => Self::unavailable(&root, format!("unreadable zip: {e}")),
            },
            _ => Self::unavailable(&root, "not a directory, VPK or zip file".to_string()),
        }
    }

    fn unavailable(root: &Path, reason: String) -> Self {
        Backend::Unavailable {
            root: root.to_path_buf(),
            reason,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Backend::RawDirectory(_) => "directory",
            Backend::Archive(_) => "vpk",
            Backend::Zip(_) => "zip",
            Backend::Unavailable { .. } => "unavailable",
        }
    }

    pub fn root(&self) -> &Path {
        match self {
            Backend::RawDirectory(b) => b.root(),
            Backend::Archive(b) => b.path(),
            Backend::Zip(b) => b.path(),
            Backend::Unavailable { root, .. } => root,
        }
    }

    /// `path` must already be normalized.
    pub fn exists(&self, path: &str) -> bool {
        match self {
            Backend::RawDirectory(b) => b.exists(path),
            Backend::Archive(b) => b.exists(path),
            Backend::Zip(b) => b.exists(path),
            Backend::Unavailable { .. } => false,
        }
    }

    pub fn entries(&self) -> Box<dyn Iterator<Item = &str> + '_> {
        match self {
            Backend::RawDirectory(b) => Box::new(b.entries().iter()),
            Backend::Archive(b) => Box::new(b.entries().iter()),
            Backend::Zip(b) => Box::new(b.entries().iter()),
            Backend::Unavailable { .. } => Box::new(std::iter::empty()),
        }
    }

    pub fn entry_count(&self) -> usize {
        match self {
            Backend::RawDirectory(b) => b.entries().len(),
            Backend::Archive(b) => b.entries().len(),
            Backend::Zip(b) => b.entries().len(),
            Backend::Unavailable { .. } => 0,
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self, Backend::Unavailable { .. })
    }
}

/// `pak01.vpk` is how mounts usually name the `pak01_dir.vpk` directory file.
fn vpk_directory_file(root: &Path) -> PathBuf {
    let is_vpk = root
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("vpk"));
    if !is_vpk || root.exists() {
        return root.to_path_buf();
    }
    let Some(stem) = root.file_stem().and_then(|s| s.to_str()) else {
        return root.to_path_buf();
    };
    if stem.ends_with("_dir") {
        return root.to_path_buf();
    }

    let candidate = root.with_file_name(format!("{stem}_dir.vpk"));
    if candidate.exists() {
        debug!("Using {} for {}", candidate.display(), root.display());
        candidate
    } else {
        root.to_path_buf()
    }
}

#[derive(Debug, Clone)]
pub struct MountedBackend {
    /// Name of the mount descriptor this root came from
    pub mount: String,
    pub backend: Backend,
}

/// Ordered, immutable set of backends.
#[derive(Debug, Clone, Default)]
pub struct VirtualFileSystem {
    backends: Vec<MountedBackend>,
}

impl VirtualFileSystem {
    /// Opens every root in order.
    pub fn mount(roots: Vec<MountRoot>) -> Self {
        let backends = roots
            .into_iter()
            .map(|root| {
                let backend = Backend::open(&root.path);
                match &backend {
                    Backend::Unavailable { root: path, reason } => {
                        warn!(
                            "Mount '{}': {} is unavailable: {}",
                            root.mount,
                            path.display(),
                            reason
                        );
                    }
                    other => {
                        info!(
                            "Mount '{}': {} {} ({} files)",
                            root.mount,
                            other.kind(),
                            other.root().display(),
                            other.entry_count()
                        );
                    }
                }
                MountedBackend {
                    mount: root.mount,
                    backend,
                }
            })
            .collect();
        Self { backends }
    }

    /// Resolves the configured mounts and opens them.
    ///
    /// Resolution finishes before any backend is opened, so a configuration
    /// error leaves nothing mounted.
    pub fn from_config(config: &Config, file_dir: &Path) -> Result<Self> {
        let locator = InstallLocator::new(config.steam_root.clone());
        let roots = MountResolver::new(&locator).resolve(&config.mounts, file_dir)?;
        Ok(Self::mount(roots))
    }

    pub fn backends(&self) -> &[MountedBackend] {
        &self.backends
    }

    pub fn unavailable(&self) -> impl Iterator<Item = &MountedBackend> + '_ {
        self.backends.iter().filter(|b| !b.backend.is_available())
    }

    pub fn exists(&self, path: &str) -> bool {
        self.locate(path).is_some()
    }

    /// Index of the first backend holding `path`.
    pub fn locate(&self, path: &str) -> Option<usize> {
        let query = normalize(path);
        self.backends
            .iter()
            .position(|mounted| mounted.backend.exists(&query))
    }

    /// `(backend index, path)` for every file, backend by backend. Paths
    /// present in several backends are listed once per backend.
    pub fn enumerate(&self) -> impl Iterator<Item = (usize, &str)> + '_ {
        self.backends
            .iter()
            .enumerate()
            .flat_map(|(i, mounted)| mounted.backend.entries().map(move |path| (i, path)))
    }
}
