//! Compile orchestration.
//!
//! [`ResourceCompiler::compile`] runs three phases and stops at the first
//! failure. Each phase maps to the process exit status reported by
//! [`CompileStatus::code`]:
//!
//! | phase | status on failure |
//! |---|---|
//! | create `build/local/resources` and `build/tempLocal/src` | 1 |
//! | validate manifest, plan layout, write artifacts | 2 |
//! | write `resource_ids.auto.h` | 3 |
//!
//! Validation and planning finish before the first artifact is written, so a
//! rejected manifest never leaves partial output behind. Directories that
//! already exist are reused, which makes repeated compiles of an unchanged
//! project produce identical files.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::codec::{BitmapEncoder, PbiEncoder};
use crate::dispatch::ArtifactWriter;
use crate::header::{write_header, HeaderOptions, HEADER_FILE_NAME};
use crate::layout::ResourceLayout;
use crate::manifest::Manifest;
use crate::ResourceError;

// ---------------------------------------------------------------------------
// CompilerConfig
// ---------------------------------------------------------------------------

/// Configuration for a [`ResourceCompiler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerConfig {
    /// Project root. Sources are read from `<project_dir>/resources`.
    pub project_dir: PathBuf,
    /// Output root. Artifacts and the header land under `<output_dir>/build`.
    pub output_dir: PathBuf,
    /// Header template options.
    pub header: HeaderOptions,
    /// Crop bitmaps to their non-transparent bounding box.
    pub crop_bitmaps: bool,
}

impl Default for CompilerConfig {
    /// Current directory for both project and output, default header, crop on.
    fn default() -> Self {
        Self {
            project_dir: PathBuf::from("."),
            output_dir: PathBuf::from("."),
            header: HeaderOptions::default(),
            crop_bitmaps: true,
        }
    }
}

impl CompilerConfig {
    /// Config that reads from and writes into `project_dir`.
    pub fn for_project(project_dir: impl Into<PathBuf>) -> Self {
        let project_dir = project_dir.into();
        Self {
            output_dir: project_dir.clone(),
            project_dir,
            ..Default::default()
        }
    }

    /// `<project>/resources`.
    pub fn source_dir(&self) -> PathBuf {
        self.project_dir.join("resources")
    }

    /// `<out>/build/local/resources`.
    pub fn artifact_dir(&self) -> PathBuf {
        self.output_dir.join("build").join("local").join("resources")
    }

    /// `<out>/build/tempLocal/src`.
    pub fn header_dir(&self) -> PathBuf {
        self.output_dir.join("build").join("tempLocal").join("src")
    }

    /// `<out>/build/tempLocal/src/resource_ids.auto.h`.
    pub fn header_path(&self) -> PathBuf {
        self.header_dir().join(HEADER_FILE_NAME)
    }
}

// ---------------------------------------------------------------------------
// Phases and status
// ---------------------------------------------------------------------------

/// The compile phase an error occurred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompilePhase {
    /// Creating the output directory trees.
    DirectorySetup,
    /// Validating the manifest and writing artifacts.
    ResourceMap,
    /// Writing the generated header.
    Header,
}

impl CompilePhase {
    /// The status a failure in this phase is reported as.
    pub fn status(self) -> CompileStatus {
        match self {
            Self::DirectorySetup => CompileStatus::DirectorySetupFailed,
            Self::ResourceMap => CompileStatus::ResourceMapFailed,
            Self::Header => CompileStatus::HeaderFailed,
        }
    }
}

impl fmt::Display for CompilePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::DirectorySetup => "directory setup",
            Self::ResourceMap => "resource map",
            Self::Header => "header generation",
        })
    }
}

/// Outcome of a compile, convertible to a process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompileStatus {
    /// Everything was written.
    Success,
    /// An output directory could not be created.
    DirectorySetupFailed,
    /// The manifest was rejected or an artifact could not be built.
    ResourceMapFailed,
    /// The header could not be written.
    HeaderFailed,
}

impl CompileStatus {
    /// Process exit code: 0, 1, 2 or 3.
    pub fn code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::DirectorySetupFailed => 1,
            Self::ResourceMapFailed => 2,
            Self::HeaderFailed => 3,
        }
    }

    /// Whether the compile succeeded.
    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

/// A failed compile.
#[derive(Debug, thiserror::Error)]
#[error("{phase} failed: {source}")]
pub struct CompileError {
    /// Where the compile stopped.
    pub phase: CompilePhase,
    /// What went wrong.
    #[source]
    pub source: ResourceError,
}

impl CompileError {
    /// The status this error is reported as.
    pub fn status(&self) -> CompileStatus {
        self.phase.status()
    }
}

/// Summary of a successful compile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileReport {
    /// Number of manifest entries.
    pub resources: usize,
    /// Number of output slots, equal to the number of header constants.
    pub slots: usize,
    /// Number of artifact files written (fonts write two per slot).
    pub files_written: usize,
    /// Location of the generated header.
    pub header_path: PathBuf,
}

// ---------------------------------------------------------------------------
// ResourceCompiler
// ---------------------------------------------------------------------------

/// Drives a full compile of one project.
pub struct ResourceCompiler {
    config: CompilerConfig,
    encoder: Box<dyn BitmapEncoder>,
}

impl fmt::Debug for ResourceCompiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceCompiler")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ResourceCompiler {
    /// Create a compiler using the built-in PBI encoder.
    pub fn new(config: CompilerConfig) -> Self {
        let encoder = PbiEncoder {
            crop: config.crop_bitmaps,
        };
        Self::with_encoder(config, Box::new(encoder))
    }

    /// Create a compiler with a custom bitmap encoder.
    pub fn with_encoder(config: CompilerConfig, encoder: Box<dyn BitmapEncoder>) -> Self {
        Self { config, encoder }
    }

    /// The active configuration.
    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Validate `manifest` and plan its layout without touching the
    /// filesystem.
    pub fn plan(&self, manifest: &[u8]) -> Result<ResourceLayout, ResourceError> {
        let manifest = Manifest::from_slice(manifest)?;
        ResourceLayout::plan(&manifest, self.config.header.first_resource_id)
    }

    /// Run all phases, returning a report or the first failure.
    ///
    /// Every failure is logged once, at the point it happens.
    pub fn compile(&self, manifest: &[u8]) -> Result<CompileReport, CompileError> {
        self.create_output_dirs()
            .map_err(|source| failed(CompilePhase::DirectorySetup, source))?;

        let (layout, files_written) =
            self.build_resources(manifest).map_err(|source| CompileError {
                phase: CompilePhase::ResourceMap,
                source,
            })?;

        let header_path = self.config.header_path();
        write_header(&header_path, &layout, &self.config.header)
            .map_err(|source| failed(CompilePhase::Header, source))?;

        let report = CompileReport {
            resources: layout.resources().len(),
            slots: layout.slot_count(),
            files_written,
            header_path,
        };
        tracing::info!(
            resources = report.resources,
            slots = report.slots,
            files = report.files_written,
            header = %report.header_path.display(),
            "resources compiled"
        );
        Ok(report)
    }

    /// Run all phases, returning the exit status.
    pub fn run(&self, manifest: &[u8]) -> CompileStatus {
        match self.compile(manifest) {
            Ok(_) => CompileStatus::Success,
            Err(e) => e.status(),
        }
    }

    fn create_output_dirs(&self) -> Result<(), ResourceError> {
        for dir in [self.config.artifact_dir(), self.config.header_dir()] {
            create_dir(&dir)?;
        }
        Ok(())
    }

    fn build_resources(&self, manifest: &[u8]) -> Result<(ResourceLayout, usize), ResourceError> {
        // The writer logs its own failures.
        let layout = self
            .plan(manifest)
            .inspect_err(|e| log_failure(CompilePhase::ResourceMap, e))?;
        let writer = ArtifactWriter::new(
            self.config.source_dir(),
            self.config.artifact_dir(),
            self.encoder.as_ref(),
        );
        let files = writer.write_all(&layout)?;
        Ok((layout, files))
    }
}

fn log_failure(phase: CompilePhase, source: &ResourceError) {
    tracing::error!(
        phase = %phase,
        entry = ?source.entry(),
        errno = ?source.errno(),
        "{source}"
    );
}

/// Log a failure of `phase` and wrap it.
fn failed(phase: CompilePhase, source: ResourceError) -> CompileError {
    log_failure(phase, &source);
    CompileError { phase, source }
}

/// Create `path` and its parents; an existing directory is not an error.
fn create_dir(path: &Path) -> Result<(), ResourceError> {
    std::fs::create_dir_all(path).map_err(|e| ResourceError::io("create path", path, e))?;
    tracing::debug!(path = %path.display(), "output directory ready");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
