//! rescomp -- resource compiler for the local simulator.
//!
//! This crate turns an `appinfo.json` resource manifest into the indexed
//! binary artifacts the simulator runtime loads, plus a generated C header
//! (`resource_ids.auto.h`) that maps every resource name to an integer id.
//!
//! # Modules
//!
//! - [`manifest`]: JSON parsing and all-or-nothing validation of the
//!   `resources.media` list.
//! - [`layout`]: pure fold over the validated entries that assigns output
//!   slots and header symbols. Dispatch and header generation both read the
//!   same [`ResourceLayout`](layout::ResourceLayout), so the slot/symbol
//!   pairing can never drift.
//! - [`codec`]: the [`BitmapEncoder`](codec::BitmapEncoder) seam and the
//!   1-bit PBI encoder built on the `image` crate.
//! - [`dispatch`]: per-kind artifact handlers (raw, png, png-trans, font).
//! - [`header`]: header template rendering.
//! - [`compiler`]: the [`ResourceCompiler`](compiler::ResourceCompiler)
//!   orchestrator and its phase-based exit status.
//!
//! # Example
//!
//! ```no_run
//! use rescomp::prelude::*;
//!
//! let config = CompilerConfig::for_project("path/to/project");
//! let compiler = ResourceCompiler::new(config);
//! let manifest = std::fs::read("path/to/project/appinfo.json").unwrap();
//! let status = compiler.run(&manifest);
//! std::process::exit(status.code());
//! ```

#![deny(unsafe_code)]

pub mod codec;
pub mod compiler;
pub mod dispatch;
pub mod header;
pub mod layout;
pub mod manifest;

use std::io;
use std::path::PathBuf;

use crate::codec::CodecError;

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Maximum length in bytes of a resource `name`.
pub const RESOURCE_NAME_MAXLEN: usize = 63;

/// Maximum length in bytes of a resource `file`.
pub const RESOURCE_FILE_MAXLEN: usize = 63;

/// Bytes reserved for the `_WHITE` / `_BLACK` suffix of png-trans symbols.
pub const PNG_TRANS_POSTFIX_LEN: usize = 6;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced while validating a manifest or building its resources.
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    /// The manifest is not valid JSON.
    #[error("resource map syntax is invalid: {0}")]
    MalformedManifest(#[source] serde_json::Error),

    /// A required object or string is missing (or has the wrong JSON type).
    #[error("resource map invalid ({location}: {expected} \"{key}\" was not found)")]
    Schema {
        /// Where the key was expected, e.g. `resources` or `resource #2`.
        location: String,
        /// The missing key.
        key: &'static str,
        /// The JSON type the key must have (`object`, `array`, `string`).
        expected: &'static str,
    },

    /// A string field exceeds its length limit.
    #[error("resource map invalid (resource #{entry}: {field} is too long, {len} > {max} bytes)")]
    FieldTooLong {
        /// Zero-based index of the entry in `media`.
        entry: usize,
        /// The offending field.
        field: &'static str,
        /// Actual length in bytes.
        len: usize,
        /// Allowed length in bytes.
        max: usize,
    },

    /// `type` is not one of `raw`, `png`, `png-trans`, `font`.
    #[error("resource map invalid (resource #{entry}: invalid resource type \"{found}\")")]
    InvalidResourceType {
        /// Zero-based index of the entry in `media`.
        entry: usize,
        /// The type string found in the manifest.
        found: String,
    },

    /// A font name does not end in its point size.
    #[error("resource #{entry}: font definition name \"{name}\" is invalid (size has to be stated at the end)")]
    InvalidFontName {
        /// Zero-based index of the entry in `media`.
        entry: usize,
        /// The rejected name.
        name: String,
    },

    /// Two output slots would define the same header constant.
    #[error("resource #{entry}: symbol RESOURCE_ID_{symbol} is already defined")]
    DuplicateSymbol {
        /// Zero-based index of the entry introducing the duplicate.
        entry: usize,
        /// The duplicated symbol, without the `RESOURCE_ID_` prefix.
        symbol: String,
    },

    /// Opening, reading or writing a file or directory failed.
    #[error("couldn't {action} \"{}\": {source}", .path.display())]
    Io {
        /// What was being attempted, e.g. `open raw resource input file`.
        action: &'static str,
        /// The path involved.
        path: PathBuf,
        /// The underlying OS error.
        #[source]
        source: io::Error,
    },

    /// The bitmap encoder rejected an input image.
    #[error("couldn't load png input file \"{}\": {source}", .path.display())]
    Codec {
        /// The source image.
        path: PathBuf,
        /// The encoder failure.
        #[source]
        source: CodecError,
    },
}

impl ResourceError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }

    /// The OS error number behind an [`Io`](Self::Io) error, if any.
    pub fn errno(&self) -> Option<i32> {
        match self {
            Self::Io { source, .. } => source.raw_os_error(),
            _ => None,
        }
    }

    /// Zero-based manifest entry this error refers to, if any.
    pub fn entry(&self) -> Option<usize> {
        match self {
            Self::FieldTooLong { entry, .. }
            | Self::InvalidResourceType { entry, .. }
            | Self::InvalidFontName { entry, .. }
            | Self::DuplicateSymbol { entry, .. } => Some(*entry),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for driving a compile.
pub mod prelude {
    pub use crate::codec::{BitmapEncoder, CodecError, EncodedBitmap, Palette, PbiEncoder};
    pub use crate::compiler::{
        CompileError, CompilePhase, CompileReport, CompileStatus, CompilerConfig,
        ResourceCompiler,
    };
    pub use crate::header::HeaderOptions;
    pub use crate::layout::{PlannedResource, ResourceLayout, ResourceSymbol};
    pub use crate::manifest::{Manifest, ResourceEntry, ResourceKind};
    pub use crate::ResourceError;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_exposes_errno() {
        let err = ResourceError::io(
            "open raw resource input file",
            "/nowhere",
            io::Error::from_raw_os_error(2),
        );
        assert_eq!(err.errno(), Some(2));
        let msg = err.to_string();
        assert!(msg.contains("open raw resource input file"), "{msg}");
        assert!(msg.contains("/nowhere"), "{msg}");
    }

    #[test]
    fn entry_index_is_reported_for_entry_errors() {
        let err = ResourceError::InvalidFontName {
            entry: 4,
            name: "Arial".to_owned(),
        };
        assert_eq!(err.entry(), Some(4));
        assert_eq!(err.errno(), None);
    }
}
