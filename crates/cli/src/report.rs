use assetscope_core::validate::{Finding, Mode, Report, Status};
use assetscope_core::vfs::VirtualFileSystem;
use nu_ansi_term::Color;
use std::io::{self, Write};
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct MountRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Mount")]
    mount: String,
    #[tabled(rename = "Kind")]
    kind: &'static str,
    #[tabled(rename = "Files")]
    files: usize,
    #[tabled(rename = "Root")]
    root: String,
}

pub struct Printer {
    pub color: bool,
    pub verbose: bool,
}

impl Printer {
    fn paint(&self, color: Color, text: &str) -> String {
        if self.color {
            color.bold().paint(text).to_string()
        } else {
            text.to_string()
        }
    }

    pub fn mounts(&self, out: &mut dyn Write, vfs: &VirtualFileSystem) -> io::Result<()> {
        let rows: Vec<MountRow> = vfs
            .backends()
            .iter()
            .enumerate()
            .map(|(index, mounted)| MountRow {
                index,
                mount: mounted.mount.clone(),
                kind: mounted.backend.kind(),
                files: mounted.backend.entry_count(),
                root: mounted.backend.root().display().to_string(),
            })
            .collect();

        if rows.is_empty() {
            writeln!(out, "No content mounted.")
        } else {
            writeln!(out, "{}", Table::new(rows))
        }
    }

    pub fn report(
        &self,
        out: &mut dyn Write,
        report: &Report,
        vfs: Option<&VirtualFileSystem>,
    ) -> io::Result<()> {
        match report.mode {
            Mode::List => self.listing(out, report),
            Mode::Check => self.check(out, report, vfs),
        }
    }

    fn listing(&self, out: &mut dyn Write, report: &Report) -> io::Result<()> {
        for finding in &report.findings {
            writeln!(
                out,
                "{:5} {:<7} {}",
                finding.reference.reference_count, finding.reference.kind, finding.reference.path
            )?;
        }
        Ok(())
    }

    fn check(
        &self,
        out: &mut dyn Write,
        report: &Report,
        vfs: Option<&VirtualFileSystem>,
    ) -> io::Result<()> {
        for unavailable in &report.unavailable {
            writeln!(
                out,
                "{} mount '{}' at {}: {}",
                self.paint(Color::Yellow, "UNAVAILABLE"),
                unavailable.mount,
                unavailable.root.display(),
                unavailable.reason
            )?;
        }

        for finding in &report.findings {
            match &finding.status {
                Status::Missing => self.missing(out, finding)?,
                Status::Found { backend } if self.verbose => {
                    let source = vfs
                        .and_then(|v| v.backends().get(*backend))
                        .map(|m| format!("'{}' ({})", m.mount, m.backend.root().display()))
                        .unwrap_or_else(|| format!("backend {backend}"));
                    writeln!(
                        out,
                        "{} {} {} in {}",
                        self.paint(Color::Green, "FOUND"),
                        finding.reference.kind,
                        finding.reference.path,
                        source
                    )?;
                }
                Status::Unchecked if self.verbose => {
                    writeln!(
                        out,
                        "{:5} {} {}",
                        finding.reference.reference_count,
                        finding.reference.kind,
                        finding.reference.path
                    )?;
                }
                _ => {}
            }
        }

        let missing = report.missing().count();
        let checked = report
            .findings
            .iter()
            .filter(|f| f.status != Status::Unchecked)
            .count();
        writeln!(
            out,
            "{} checked, {} found, {} missing",
            checked,
            report.found_count(),
            missing
        )
    }

    fn missing(&self, out: &mut dyn Write, finding: &Finding) -> io::Result<()> {
        writeln!(
            out,
            "{} {} {} ({}, {} reference{})",
            self.paint(Color::Red, "MISSING"),
            finding.reference.kind,
            finding.reference.path,
            finding.canonical.as_deref().unwrap_or("-"),
            finding.reference.reference_count,
            if finding.reference.reference_count == 1 { "" } else { "s" }
        )
    }
}
