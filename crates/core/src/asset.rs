use indexmap::IndexMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AssetKind {
    Texture,
    Model,
    /// Entity classname; listed but never looked up
    Entity,
}

impl AssetKind {
    pub fn label(&self) -> &'static str {
        match self {
            AssetKind::Texture => "texture",
            AssetKind::Model => "model",
            AssetKind::Entity => "entity",
        }
    }

    pub fn is_checkable(&self) -> bool {
        !matches!(self, AssetKind::Entity)
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

/// An asset path as written in the scene, with how often it appears.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetReference {
    pub kind: AssetKind,
    pub path: String,
    pub reference_count: usize,
}

impl AssetReference {
    pub fn new(kind: AssetKind, path: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            reference_count: 1,
        }
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.reference_count = count;
        self
    }

    /// Path to look up in the virtual filesystem. Textures name a material,
    /// so they resolve to its `.vmt`; models are already file paths.
    pub fn canonical_path(&self) -> Option<String> {
        match self.kind {
            AssetKind::Texture => Some(format!("materials/{}.vmt", self.path)),
            AssetKind::Model => Some(self.path.clone()),
            AssetKind::Entity => None,
        }
    }
}

/// Merges repeated references by kind and exact path, summing counts and
/// keeping the order of first occurrence.
pub fn collect(references: impl IntoIterator<Item = AssetReference>) -> Vec<AssetReference> {
    let mut merged: IndexMap<(AssetKind, String), usize> = IndexMap::new();
    for reference in references {
        *merged.entry((reference.kind, reference.path)).or_default() += reference.reference_count;
    }
    merged
        .into_iter()
        .map(|((kind, path), count)| AssetReference::new(kind, path).with_count(count))
        .collect()
}
