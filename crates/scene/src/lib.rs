//! Scene input for asset validation.
//!
//! Reads Hammer `.vmf` files and turns them into the asset references that
//! `assetscope-core` checks.

pub mod encoding;
pub mod error;
pub mod vmf;

pub use encoding::Encoding;
pub use error::{Result, SceneError};
pub use vmf::{Brush, Entity, Scene, Side};
