//! Artifact handlers.
//!
//! [`ArtifactWriter`] turns each [`PlannedResource`] into files under the
//! artifact directory, named by output slot:
//!
//! - `raw`: `<i>` is a verbatim copy of the source.
//! - `png`: `<i>` is the PBI header followed by the pixel bits.
//! - `png-trans`: `<i>` holds the white plane, `<i + 1>` the black plane.
//! - `font`: `<i>_f` is a verbatim copy of the font, `<i>` holds the point
//!   size as a native-endian `i32`.
//!
//! Handlers never panic; every failure comes back as a [`ResourceError`] and
//! aborts the compile.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::codec::{BitmapEncoder, EncodedBitmap, Palette};
use crate::layout::{PlannedResource, ResourceLayout};
use crate::manifest::{font_point_size, ResourceKind};
use crate::ResourceError;

/// Suffix of the font data artifact.
pub const FONT_DATA_SUFFIX: &str = "_f";

/// Writes the artifacts of planned resources.
pub struct ArtifactWriter<'a> {
    source_dir: PathBuf,
    artifact_dir: PathBuf,
    encoder: &'a dyn BitmapEncoder,
}

impl std::fmt::Debug for ArtifactWriter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactWriter")
            .field("source_dir", &self.source_dir)
            .field("artifact_dir", &self.artifact_dir)
            .finish_non_exhaustive()
    }
}

impl<'a> ArtifactWriter<'a> {
    /// Create a writer reading sources from `source_dir` and writing into
    /// `artifact_dir`. Both directories must already exist.
    pub fn new(
        source_dir: impl Into<PathBuf>,
        artifact_dir: impl Into<PathBuf>,
        encoder: &'a dyn BitmapEncoder,
    ) -> Self {
        Self {
            source_dir: source_dir.into(),
            artifact_dir: artifact_dir.into(),
            encoder,
        }
    }

    /// Path of the artifact for `output_index`.
    pub fn artifact_path(&self, output_index: usize) -> PathBuf {
        self.artifact_dir.join(output_index.to_string())
    }

    /// Path of the font data artifact for `output_index`.
    pub fn font_data_path(&self, output_index: usize) -> PathBuf {
        self.artifact_dir
            .join(format!("{output_index}{FONT_DATA_SUFFIX}"))
    }

    /// Write every resource of `layout` in order, stopping at the first
    /// failure. Returns the number of files written.
    pub fn write_all(&self, layout: &ResourceLayout) -> Result<usize, ResourceError> {
        let mut files = 0;
        for resource in layout.resources() {
            match self.write(resource) {
                Ok(n) => files += n,
                Err(e) => {
                    tracing::error!(
                        entry = resource.entry_index,
                        name = %resource.name,
                        kind = %resource.kind,
                        errno = ?e.errno(),
                        error = %e,
                        "failed to build resource"
                    );
                    return Err(e);
                }
            }
        }
        Ok(files)
    }

    /// Write the artifacts of one resource. Returns the number of files
    /// written.
    pub fn write(&self, resource: &PlannedResource) -> Result<usize, ResourceError> {
        let source = self.source_dir.join(&resource.file);
        let index = resource.output_index;
        match resource.kind {
            ResourceKind::Raw => {
                self.write_raw(&source, index)?;
                Ok(1)
            }
            ResourceKind::Png => {
                self.write_png(&source, index)?;
                Ok(1)
            }
            ResourceKind::PngTrans => {
                self.write_png_trans(&source, index)?;
                Ok(2)
            }
            ResourceKind::Font => {
                let size = font_point_size(&resource.name).ok_or_else(|| {
                    ResourceError::InvalidFontName {
                        entry: resource.entry_index,
                        name: resource.name.clone(),
                    }
                })?;
                self.write_font(&source, index, size)?;
                Ok(2)
            }
        }
    }

    /// Copy `source` verbatim to slot `index`.
    pub fn write_raw(&self, source: &Path, index: usize) -> Result<(), ResourceError> {
        let dest = self.artifact_path(index);
        copy_file(source, &dest, &RAW_COPY)?;
        tracing::debug!(index, source = %source.display(), "raw resource written");
        Ok(())
    }

    /// Encode `source` with the default palette into slot `index`.
    pub fn write_png(&self, source: &Path, index: usize) -> Result<(), ResourceError> {
        let dest = self.artifact_path(index);
        let mut out = create_output(&dest, "open png resource output file")?;
        let bitmap = self.encode(source, Palette::default())?;
        write_bitmap(&mut out, &dest, &bitmap)?;
        tracing::debug!(index, source = %source.display(), "png resource written");
        Ok(())
    }

    /// Encode both colour planes of `source`: white into slot `index`, black
    /// into slot `index + 1`.
    ///
    /// Both outputs are opened before decoding. If encoding fails the open
    /// handles are dropped on the way out.
    pub fn write_png_trans(&self, source: &Path, index: usize) -> Result<(), ResourceError> {
        let white_path = self.artifact_path(index);
        let black_path = self.artifact_path(index + 1);

        let mut black_out = create_output(&black_path, "open png-trans black output file")?;
        let mut white_out = create_output(&white_path, "open png-trans white output file")?;

        let black = self.encode(source, Palette::Black)?;
        let white = self.encode(source, Palette::White)?;

        write_bitmap(&mut black_out, &black_path, &black)?;
        write_bitmap(&mut white_out, &white_path, &white)?;
        tracing::debug!(index, source = %source.display(), "png-trans resource written");
        Ok(())
    }

    /// Copy the font to `<index>_f` and store `size` in slot `index`.
    pub fn write_font(&self, source: &Path, index: usize, size: i32) -> Result<(), ResourceError> {
        let data_path = self.font_data_path(index);
        let size_path = self.artifact_path(index);

        copy_file(source, &data_path, &FONT_COPY)?;

        let mut size_out = create_output(&size_path, "open font size output file")?;
        size_out
            .write_all(&size.to_ne_bytes())
            .and_then(|()| size_out.flush())
            .map_err(|e| ResourceError::io("write font size output file", &size_path, e))?;
        tracing::debug!(index, size, source = %source.display(), "font resource written");
        Ok(())
    }

    fn encode(&self, source: &Path, palette: Palette) -> Result<EncodedBitmap, ResourceError> {
        self.encoder
            .encode(source, palette)
            .map_err(|e| ResourceError::Codec {
                path: source.to_path_buf(),
                source: e,
            })
    }
}

// ---------------------------------------------------------------------------
// File helpers
// ---------------------------------------------------------------------------

fn create_output(path: &Path, action: &'static str) -> Result<BufWriter<File>, ResourceError> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|e| ResourceError::io(action, path, e))
}

fn write_bitmap(
    out: &mut BufWriter<File>,
    path: &Path,
    bitmap: &EncodedBitmap,
) -> Result<(), ResourceError> {
    out.write_all(&bitmap.header)
        .and_then(|()| out.write_all(&bitmap.bits))
        .and_then(|()| out.flush())
        .map_err(|e| ResourceError::io("write bitmap output file", path, e))
}

/// Log actions for the three steps of a verbatim copy.
struct CopyActions {
    open_input: &'static str,
    open_output: &'static str,
    write_output: &'static str,
}

const RAW_COPY: CopyActions = CopyActions {
    open_input: "open raw resource input file",
    open_output: "open raw resource output file",
    write_output: "write raw resource output file",
};

const FONT_COPY: CopyActions = CopyActions {
    open_input: "open font input file",
    open_output: "open font output file",
    write_output: "write font output file",
};

fn copy_file(source: &Path, dest: &Path, actions: &CopyActions) -> Result<(), ResourceError> {
    let mut input =
        File::open(source).map_err(|e| ResourceError::io(actions.open_input, source, e))?;
    let mut output = create_output(dest, actions.open_output)?;
    io::copy(&mut input, &mut output)
        .and_then(|_| output.flush())
        .map_err(|e| ResourceError::io(actions.write_output, dest, e))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
