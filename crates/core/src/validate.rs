//! Classifies asset references against a virtual filesystem.

use crate::asset::{self, AssetReference};
use crate::vfs::{Backend, VirtualFileSystem};
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Look every reference up and fail on anything missing
    Check,
    /// Only report references and their counts
    List,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    /// Found in the backend at this index
    Found { backend: usize },
    Missing,
    /// Not looked up (list mode, or a kind with no file behind it)
    Unchecked,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub reference: AssetReference,
    pub canonical: Option<String>,
    pub status: Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

impl Outcome {
    pub fn exit_code(&self) -> u8 {
        match self {
            Outcome::Success => 0,
            Outcome::Failure => 1,
        }
    }
}

/// A mount root that could not be read during the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnavailableMount {
    pub mount: String,
    pub root: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct Report {
    pub mode: Mode,
    pub findings: Vec<Finding>,
    pub unavailable: Vec<UnavailableMount>,
}

impl Report {
    /// Lists references without touching any content source.
    pub fn listing(references: impl IntoIterator<Item = AssetReference>) -> Self {
        let findings = asset::collect(references)
            .into_iter()
            .map(|reference| Finding {
                canonical: reference.canonical_path(),
                reference,
                status: Status::Unchecked,
            })
            .collect();
        Self {
            mode: Mode::List,
            findings,
            unavailable: Vec::new(),
        }
    }

    pub fn outcome(&self) -> Outcome {
        if self.missing().next().is_some() {
            Outcome::Failure
        } else {
            Outcome::Success
        }
    }

    pub fn missing(&self) -> impl Iterator<Item = &Finding> + '_ {
        self.findings.iter().filter(|f| f.status == Status::Missing)
    }

    pub fn found_count(&self) -> usize {
        self.findings
            .iter()
            .filter(|f| matches!(f.status, Status::Found { .. }))
            .count()
    }
}

pub struct Validator<'a> {
    vfs: &'a VirtualFileSystem,
}

impl<'a> Validator<'a> {
    pub fn new(vfs: &'a VirtualFileSystem) -> Self {
        Self { vfs }
    }

    pub fn run(&self, mode: Mode, references: impl IntoIterator<Item = AssetReference>) -> Report {
        match mode {
            Mode::Check => self.check(references),
            Mode::List => Report::listing(references),
        }
    }

    /// Looks up each distinct reference once.
    pub fn check(&self, references: impl IntoIterator<Item = AssetReference>) -> Report {
        let findings: Vec<Finding> = asset::collect(references)
            .into_iter()
            .map(|reference| {
                let canonical = reference.canonical_path();
                let status = match &canonical {
                    Some(path) if reference.kind.is_checkable() => match self.vfs.locate(path) {
                        Some(backend) => Status::Found { backend },
                        None => Status::Missing,
                    },
                    _ => Status::Unchecked,
                };
                debug!("{} {} -> {:?}", reference.kind, reference.path, status);
                Finding {
                    reference,
                    canonical,
                    status,
                }
            })
            .collect();

        let unavailable = self
            .vfs
            .unavailable()
            .filter_map(|mounted| match &mounted.backend {
                Backend::Unavailable { root, reason } => Some(UnavailableMount {
                    mount: mounted.mount.clone(),
                    root: root.clone(),
                    reason: reason.clone(),
                }),
                _ => None,
            })
            .collect();

        let report = Report {
            mode: Mode::Check,
            findings,
            unavailable,
        };
        info!(
            "Checked {} references: {} found, {} missing",
            report.findings.len(),
            report.found_count(),
            report.missing().count()
        );
        report
    }
}
