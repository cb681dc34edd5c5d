//! Hammer `.vmf` scenes, reduced to what asset validation reads.
//!
//! A VMF is KeyValues text: one `world` block holding brushes (`solid`),
//! then one `entity` block per entity. Brush entities carry their own
//! `solid` blocks, and anything hidden in the editor is wrapped in a
//! `hidden` block at the same level.

use crate::encoding::Encoding;
use crate::error::{Result, SceneError};
use assetscope_core::keyvalues::{self, Block};
use assetscope_core::{AssetKind, AssetReference};
use std::path::Path;
use tracing::debug;

/// Entity keys that name a model file.
pub const MODEL_KEYS: [&str; 3] = ["model", "viewmodel", "worldmodel"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Side {
    pub mat: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Brush {
    pub sides: Vec<Side>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entity {
    pub classname: Option<String>,
    /// Values of the [`MODEL_KEYS`] present on the entity, in that order
    pub models: Vec<String>,
    pub brushes: Vec<Brush>,
}

impl Entity {
    fn from_block(block: &Block) -> Self {
        Self {
            classname: block.get_text("classname").map(str::to_string),
            models: MODEL_KEYS
                .iter()
                .filter_map(|key| block.get_text(key))
                .map(str::to_string)
                .collect(),
            brushes: brushes_of(block),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scene {
    /// The `world` block; its brushes are the level geometry
    pub world: Entity,
    pub entities: Vec<Entity>,
}

impl Scene {
    pub fn parse(text: &str) -> Result<Self> {
        let root = keyvalues::parse(text)?;

        let world = root
            .blocks("world")
            .next()
            .map(Entity::from_block)
            .unwrap_or_default();

        let mut entities = Vec::new();
        for pair in root.pairs() {
            let Some(block) = pair.value.as_block() else {
                continue;
            };
            if pair.key.eq_ignore_ascii_case("entity") {
                entities.push(Entity::from_block(block));
            } else if pair.key.eq_ignore_ascii_case("hidden") {
                entities.extend(block.blocks("entity").map(Entity::from_block));
            }
        }

        debug!(
            "Parsed scene: {} world brushes, {} entities",
            world.brushes.len(),
            entities.len()
        );
        Ok(Self { world, entities })
    }

    pub fn load(path: &Path, encoding: Encoding) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|source| SceneError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&encoding.decode(&bytes))
    }

    /// World brushes first, then brush entities in file order.
    pub fn brushes(&self) -> impl Iterator<Item = &Brush> + '_ {
        self.world
            .brushes
            .iter()
            .chain(self.entities.iter().flat_map(|e| e.brushes.iter()))
    }

    /// One reference per occurrence of each selected kind: textures from
    /// brush sides, models from entity model keys, entity classnames.
    pub fn references(&self, kinds: &[AssetKind]) -> Vec<AssetReference> {
        let mut out = Vec::new();
        if kinds.contains(&AssetKind::Texture) {
            out.extend(
                self.brushes()
                    .flat_map(|b| b.sides.iter())
                    .map(|side| AssetReference::new(AssetKind::Texture, side.mat.clone())),
            );
        }
        if kinds.contains(&AssetKind::Model) {
            out.extend(
                self.entities
                    .iter()
                    .flat_map(|e| e.models.iter())
                    .map(|m| AssetReference::new(AssetKind::Model, m.as_str())),
            );
        }
        if kinds.contains(&AssetKind::Entity) {
            out.extend(
                self.entities
                    .iter()
                    .filter_map(|e| e.classname.as_deref())
                    .map(|c| AssetReference::new(AssetKind::Entity, c)),
            );
        }
        out
    }
}

fn brushes_of(block: &Block) -> Vec<Brush> {
    let hidden = block.blocks("hidden").flat_map(|h| h.blocks("solid"));
    block
        .blocks("solid")
        .chain(hidden)
        .map(|solid| Brush {
            sides: solid
                .blocks("side")
                .filter_map(|side| side.get_text("material"))
                .map(|mat| Side {
                    mat: mat.to_string(),
                })
                .collect(),
        })
        .collect()
}
