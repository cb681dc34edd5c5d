use super::index::PathIndex;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Plain directory tree, matched case-insensitively even on case-sensitive
/// filesystems.
#[derive(Debug, Clone)]
pub struct RawDirectory {
    root: PathBuf,
    index: PathIndex,
}

impl RawDirectory {
    /// Walks `root` once. Entries that cannot be read are skipped.
    pub fn index(root: &Path) -> Self {
        let mut index = PathIndex::default();
        for entry in WalkDir::new(root).min_depth(1).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("Skipping unreadable entry under {}: {}", root.display(), e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(root) else {
                continue;
            };
            let relative: Vec<_> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect();
            index.insert(&relative.join("/"));
        }

        Self {
            root: root.to_path_buf(),
            index,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn exists(&self, path: &str) -> bool {
        self.index.contains(path)
    }

    pub fn entries(&self) -> &PathIndex {
        &self.index
    }
}
