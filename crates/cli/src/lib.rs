mod report;

use assetscope_core::validate::{Mode, Outcome, Report, Validator};
use assetscope_core::{AppLocator, AssetKind, Config, InstallLocator, VirtualFileSystem};
use assetscope_scene::{Encoding, Scene};
use clap::{Parser, Subcommand, ValueEnum};
use report::Printer;
use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(
    name = "assetscope",
    version,
    about = "Checks that every asset a map references exists in the mounted content",
    long_about = "Reads a Hammer .vmf scene, collects the textures, models and entities it references, \
                  and looks each one up in the configured content sources (directories, VPK archives \
                  and zip packages, optionally discovered through Steam). Exits with status 1 if \
                  anything is missing.",
    args_conflicts_with_subcommands = true,
    subcommand_negates_reqs = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to the scene file
    #[arg(short = 'i', long = "input", value_name = "SCENE", required = true)]
    pub input: Option<PathBuf>,

    /// Check references against the mounted content, or only list them
    #[arg(long, value_enum, default_value_t = ModeArg::Check)]
    pub mode: ModeArg,

    /// Include brush textures (the default when no kind is selected)
    #[arg(short = 't', long)]
    pub textures: bool,

    /// Include entity models
    #[arg(short = 'm', long)]
    pub models: bool,

    /// Include entity classnames (listed, never looked up)
    #[arg(short = 'e', long)]
    pub entities: bool,

    /// Extra content directory to search, after the configured mounts
    #[arg(short = 's', long = "search-path", value_name = "DIR")]
    pub search_paths: Vec<PathBuf>,

    /// JSON file describing the content mounts
    #[arg(short = 'p', long = "path-config", value_name = "JSON")]
    pub path_config: Option<PathBuf>,

    /// Steam installation directory used for appid mounts
    #[arg(long, value_name = "DIR")]
    pub steam_root: Option<PathBuf>,

    /// Show mounts and where each asset was found
    #[arg(short, long)]
    pub verbose: bool,

    /// Text encoding of the scene file (utf-8, latin-1)
    #[arg(long, default_value = "utf-8")]
    pub encoding: Encoding,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the install directory of a Steam app
    #[command(
        long_about = "Looks the app up in every Steam library folder and prints its install \
                      directory. Exits with status 1 if no library has it installed."
    )]
    Locate {
        /// Steam app id to look for
        #[arg(short = 'a', long = "app", value_name = "APPID")]
        app: u32,

        /// Steam installation directory
        #[arg(long, value_name = "DIR")]
        steam_root: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Check,
    List,
}

impl From<ModeArg> for Mode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Check => Mode::Check,
            ModeArg::List => Mode::List,
        }
    }
}

impl Cli {
    pub fn kinds(&self) -> Vec<AssetKind> {
        let mut kinds = Vec::new();
        if self.textures || !(self.models || self.entities) {
            kinds.push(AssetKind::Texture);
        }
        if self.models {
            kinds.push(AssetKind::Model);
        }
        if self.entities {
            kinds.push(AssetKind::Entity);
        }
        kinds
    }

    /// Directory substituted for `${fileDir}` in mount paths.
    pub fn file_dir(&self) -> PathBuf {
        let parent = self
            .input
            .as_deref()
            .and_then(Path::parent)
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        std::path::absolute(parent).unwrap_or_else(|_| parent.to_path_buf())
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let _guard = assetscope_core::logging::init_logging("cli", cli.verbose);

    let stdout = std::io::stdout();
    let color = stdout.is_terminal();
    match execute(&cli, &mut stdout.lock(), color) {
        Ok(outcome) => ExitCode::from(outcome.exit_code()),
        Err(e) => {
            error!("{}", e);
            print_error(&mut std::io::stderr(), e.as_ref());
            ExitCode::from(1)
        }
    }
}

/// Fatal errors always reach stderr, whatever the log filter hides.
fn print_error(stderr: &mut dyn Write, err: &dyn std::error::Error) {
    let _ = writeln!(stderr, "Error: {}", err);
}

/// Runs the selected command and writes its result to `out`.
pub fn execute(
    cli: &Cli,
    out: &mut dyn Write,
    color: bool,
) -> Result<Outcome, Box<dyn std::error::Error>> {
    match &cli.command {
        Some(Commands::Locate { app, steam_root }) => locate(*app, steam_root.clone(), out),
        None => validate(cli, out, color),
    }
}

fn locate(
    app_id: u32,
    steam_root: Option<PathBuf>,
    out: &mut dyn Write,
) -> Result<Outcome, Box<dyn std::error::Error>> {
    let locator = InstallLocator::new(steam_root);
    match locator.locate_app(app_id)? {
        Some(path) => {
            writeln!(out, "{}", path.display())?;
            Ok(Outcome::Success)
        }
        None => {
            let root = locator
                .steam_root()
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            warn!("App {} is not installed in any library under {}", app_id, root);
            Ok(Outcome::Failure)
        }
    }
}

/// Configuration and scene errors abort before anything is looked up.
fn validate(
    cli: &Cli,
    out: &mut dyn Write,
    color: bool,
) -> Result<Outcome, Box<dyn std::error::Error>> {
    let input = cli.input.as_deref().ok_or("no scene file given (--input)")?;
    let printer = Printer {
        color,
        verbose: cli.verbose,
    };
    let mode = Mode::from(cli.mode);

    let config = match mode {
        Mode::Check => Some(Config::load(
            cli.path_config.as_deref(),
            &cli.search_paths,
            cli.steam_root.clone(),
        )?),
        Mode::List => None,
    };

    let scene = Scene::load(input, cli.encoding)?;
    let references = scene.references(&cli.kinds());
    info!(
        "Loaded {} with {} references",
        input.display(),
        references.len()
    );

    let Some(config) = config else {
        let report = Report::listing(references);
        printer.report(out, &report, None)?;
        return Ok(report.outcome());
    };

    let vfs = VirtualFileSystem::from_config(&config, &cli.file_dir())?;
    if cli.verbose {
        printer.mounts(out, &vfs)?;
    }

    let report = Validator::new(&vfs).check(references);
    printer.report(out, &report, Some(&vfs))?;
    Ok(report.outcome())
}
