//! `rescomp` -- compile a project's resources for the local simulator.
//!
//! Usage:
//!   rescomp                          # uses ./appinfo.json
//!   rescomp path/to/appinfo.json     # when not run from the project folder
//!   rescomp --list                   # print the resource id table as JSON
//!
//! The exit status is 0 on success, 1 if no manifest was found or the build
//! directories could not be created, 2 if the manifest or a resource was
//! rejected, and 3 if the header could not be written.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use rescomp::prelude::*;
use tracing_subscriber::EnvFilter;

/// File name the manifest must have.
const MANIFEST_NAME: &str = "appinfo.json";

#[derive(Parser, Debug)]
#[command(name = "rescomp")]
#[command(about = "Compile appinfo.json resources for the local simulator")]
struct Cli {
    /// Path to appinfo.json, used when ./appinfo.json does not exist
    manifest: Option<PathBuf>,

    /// Output root (defaults to the project directory)
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Value of the first resource constant in the header
    #[arg(long, default_value_t = 1)]
    first_id: u32,

    /// Name the app's main() is redefined to
    #[arg(long, default_value = "pbl_main")]
    entry_point: String,

    /// Keep full image bounds instead of cropping to opaque pixels
    #[arg(long)]
    no_crop: bool,

    /// Print the planned resource table as JSON and write nothing
    #[arg(long)]
    list: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = run(&cli, Path::new(MANIFEST_NAME), &mut io::stdout().lock());
    ExitCode::from(exit_code(&result))
}

/// Map the outcome of [`run`] to the process exit code, logging errors.
fn exit_code(result: &Result<CompileStatus>) -> u8 {
    match result {
        Ok(status) => status.code() as u8,
        Err(e) => {
            tracing::error!("{e:#}");
            1
        }
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_target(false)
        .without_time()
        .init();
}

/// Compile (or with `--list`, plan) the project whose manifest is found at
/// `default_manifest` or the command-line path. The `--list` table goes to
/// `out`.
fn run(cli: &Cli, default_manifest: &Path, out: &mut impl Write) -> Result<CompileStatus> {
    let manifest_path = locate_manifest(default_manifest, cli.manifest.as_deref())
        .context(
            "no appinfo.json found; run the resource compiler in the project main folder \
             or pass the path to appinfo.json",
        )?;
    let manifest = std::fs::read(&manifest_path)
        .with_context(|| format!("failed to read {}", manifest_path.display()))?;

    let compiler = ResourceCompiler::new(config_for(cli, &manifest_path));
    tracing::debug!(manifest = %manifest_path.display(), config = ?compiler.config(), "starting");

    if cli.list {
        return match compiler.plan(&manifest) {
            Ok(layout) => {
                serde_json::to_writer_pretty(&mut *out, &layout)?;
                writeln!(out)?;
                Ok(CompileStatus::Success)
            }
            Err(e) => {
                tracing::error!(entry = ?e.entry(), "{e}");
                Ok(CompilePhase::ResourceMap.status())
            }
        };
    }

    Ok(compiler.run(&manifest))
}

/// Pick the manifest: `default` if it exists, otherwise `arg` if it exists
/// and is named `appinfo.json`.
fn locate_manifest(default: &Path, arg: Option<&Path>) -> Option<PathBuf> {
    if default.exists() {
        return Some(default.to_path_buf());
    }
    arg.filter(|p| p.exists() && p.file_name().is_some_and(|n| n == MANIFEST_NAME))
        .map(Path::to_path_buf)
}

/// Directory containing the manifest, `.` for a bare file name.
fn project_dir(manifest_path: &Path) -> PathBuf {
    match manifest_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn config_for(cli: &Cli, manifest_path: &Path) -> CompilerConfig {
    let mut config = CompilerConfig::for_project(project_dir(manifest_path));
    if let Some(out_dir) = &cli.out_dir {
        config.output_dir = out_dir.clone();
    }
    config.header = HeaderOptions {
        first_resource_id: cli.first_id,
        entry_point_alias: cli.entry_point.clone(),
    };
    config.crop_bitmaps = !cli.no_crop;
    config
}
