//! Content dependency validation for Source-engine projects.
//!
//! The pipeline is: mount descriptors ([`mount`]) are resolved, using Steam
//! install discovery ([`install`]) where needed, into an ordered list of
//! roots; those roots become a read-only [`vfs::VirtualFileSystem`]; asset
//! references pulled from a scene are then checked against it
//! ([`validate`]).

pub mod asset;
pub mod config;
pub mod error;
pub mod install;
pub mod keyvalues;
pub mod logging;
pub mod mount;
pub mod validate;
pub mod vfs;

pub use asset::{AssetKind, AssetReference};
pub use config::Config;
pub use error::{AssetscopeError, Result};
pub use install::{AppLocator, InstallLocator};
pub use mount::{MountDescriptor, MountResolver, MountRoot, MountSource};
pub use validate::{Finding, Mode, Outcome, Report, Status, Validator};
pub use vfs::VirtualFileSystem;
