//! Mount descriptors and their resolution into concrete search roots.

use crate::error::{AssetscopeError, Result};
use crate::install::AppLocator;
use std::path::{Path, PathBuf};
use tracing::debug;

/// The only variable recognized in path templates.
pub const FILE_DIR_VAR: &str = "${fileDir}";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountSource {
    /// Literal path, may contain `${fileDir}`
    RawPathTemplate(String),
    /// Install directory of a Steam app
    InstallDiscovery { app_id: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountDescriptor {
    pub name: String,
    pub source: MountSource,
    /// Paths relative to the resolved root; empty mounts the root itself
    pub submounts: Vec<String>,
}

impl MountDescriptor {
    pub fn raw(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: MountSource::RawPathTemplate(template.into()),
            submounts: Vec::new(),
        }
    }

    pub fn app(name: impl Into<String>, app_id: u32) -> Self {
        Self {
            name: name.into(),
            source: MountSource::InstallDiscovery { app_id },
            submounts: Vec::new(),
        }
    }

    pub fn with_submounts<S: Into<String>>(mut self, submounts: impl IntoIterator<Item = S>) -> Self {
        self.submounts = submounts.into_iter().map(Into::into).collect();
        self
    }
}

/// One concrete search root, tagged with the descriptor it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountRoot {
    pub mount: String,
    pub path: PathBuf,
}

pub struct MountResolver<'a> {
    locator: &'a dyn AppLocator,
}

impl<'a> MountResolver<'a> {
    pub fn new(locator: &'a dyn AppLocator) -> Self {
        Self { locator }
    }

    /// Resolves every descriptor, in order, into its search roots.
    ///
    /// Fails on the first descriptor that cannot be resolved; nothing is
    /// opened on disk here, so an error leaves no backends behind.
    pub fn resolve(
        &self,
        descriptors: &[MountDescriptor],
        file_dir: &Path,
    ) -> Result<Vec<MountRoot>> {
        let mut roots = Vec::new();
        for descriptor in descriptors {
            let base = self.resolve_base(descriptor, file_dir)?;
            debug!("Mount '{}' resolved to {}", descriptor.name, base.display());

            if descriptor.submounts.is_empty() {
                roots.push(MountRoot {
                    mount: descriptor.name.clone(),
                    path: base,
                });
                continue;
            }
            for submount in &descriptor.submounts {
                roots.push(MountRoot {
                    mount: descriptor.name.clone(),
                    path: base.join(submount),
                });
            }
        }
        Ok(roots)
    }

    fn resolve_base(&self, descriptor: &MountDescriptor, file_dir: &Path) -> Result<PathBuf> {
        match &descriptor.source {
            MountSource::RawPathTemplate(template) => {
                expand_template(template, file_dir).map_err(|reason| AssetscopeError::InvalidMount {
                    mount: descriptor.name.clone(),
                    reason,
                })
            }
            MountSource::InstallDiscovery { app_id } => self
                .locator
                .locate_app(*app_id)
                .map_err(|source| AssetscopeError::AppLookup {
                    mount: descriptor.name.clone(),
                    app_id: *app_id,
                    source: Box::new(source),
                })?
                .ok_or_else(|| AssetscopeError::AppNotFound {
                    mount: descriptor.name.clone(),
                    app_id: *app_id,
                }),
        }
    }
}

fn expand_template(template: &str, file_dir: &Path) -> std::result::Result<PathBuf, String> {
    let expanded = template.replace(FILE_DIR_VAR, &file_dir.to_string_lossy());
    if let Some(start) = expanded.find("${") {
        let rest = &expanded[start..];
        let var = rest.find('}').map_or(rest, |end| &rest[..=end]);
        return Err(format!("unknown variable {var} in path \"{template}\""));
    }
    Ok(PathBuf::from(expanded))
}
