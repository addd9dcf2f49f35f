//! Resource manifest parsing and validation.
//!
//! A manifest is the project's `appinfo.json`. Only `resources.media` is
//! read; every other key is ignored:
//!
//! ```json
//! {
//!   "resources": {
//!     "media": [
//!       { "name": "IMAGE_LOGO", "file": "images/logo.png", "type": "png" },
//!       { "name": "FONT_ROBOTO_21", "file": "fonts/Roboto.ttf", "type": "font" }
//!     ]
//!   }
//! }
//! ```
//!
//! Validation is all-or-nothing: [`Manifest::from_slice`] checks every entry
//! in declaration order and stops at the first failure, so a manifest that
//! comes back `Ok` can be dispatched without further checks.

use std::fmt;
use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use crate::{ResourceError, PNG_TRANS_POSTFIX_LEN, RESOURCE_FILE_MAXLEN, RESOURCE_NAME_MAXLEN};

// ---------------------------------------------------------------------------
// ResourceKind
// ---------------------------------------------------------------------------

/// The `type` of a resource entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    /// Copied verbatim.
    Raw,
    /// Converted to a 1-bit PBI bitmap.
    Png,
    /// Converted to two 1-bit PBI bitmaps, one per colour plane.
    PngTrans,
    /// Font data plus a point-size record.
    Font,
}

impl ResourceKind {
    /// Parse the manifest spelling of a resource type.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "raw" => Some(Self::Raw),
            "png" => Some(Self::Png),
            "png-trans" => Some(Self::PngTrans),
            "font" => Some(Self::Font),
            _ => None,
        }
    }

    /// The manifest spelling of this type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Png => "png",
            Self::PngTrans => "png-trans",
            Self::Font => "font",
        }
    }

    /// Number of output slots (and header symbols) an entry of this kind uses.
    pub fn slot_count(self) -> usize {
        match self {
            Self::PngTrans => 2,
            Self::Raw | Self::Png | Self::Font => 1,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ResourceEntry
// ---------------------------------------------------------------------------

/// One validated element of `resources.media`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceEntry {
    /// Symbolic name, used for the header constant.
    pub name: String,
    /// Source path relative to the project's `resources/` directory.
    pub file: String,
    /// Resource type.
    #[serde(rename = "type")]
    pub kind: ResourceKind,
}

impl ResourceEntry {
    /// Validate the `index`-th element of `media`.
    fn validate(index: usize, value: &Value) -> Result<Self, ResourceError> {
        let name = required_str(index, value, "name")?;
        let file = required_str(index, value, "file")?;
        let kind_str = required_str(index, value, "type")?;

        check_len(index, "name", name, RESOURCE_NAME_MAXLEN)?;
        check_len(index, "file", file, RESOURCE_FILE_MAXLEN)?;

        let kind =
            ResourceKind::parse(kind_str).ok_or_else(|| ResourceError::InvalidResourceType {
                entry: index,
                found: kind_str.to_owned(),
            })?;

        match kind {
            ResourceKind::PngTrans => {
                check_len(
                    index,
                    "name",
                    name,
                    RESOURCE_FILE_MAXLEN - PNG_TRANS_POSTFIX_LEN,
                )?;
            }
            ResourceKind::Font => {
                if font_point_size(name).is_none() {
                    return Err(ResourceError::InvalidFontName {
                        entry: index,
                        name: name.to_owned(),
                    });
                }
            }
            ResourceKind::Raw | ResourceKind::Png => {}
        }

        Ok(Self {
            name: name.to_owned(),
            file: file.to_owned(),
            kind,
        })
    }
}

fn required_str<'a>(
    index: usize,
    value: &'a Value,
    key: &'static str,
) -> Result<&'a str, ResourceError> {
    value
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ResourceError::Schema {
            location: format!("resource #{index}"),
            key,
            expected: "string",
        })
}

fn check_len(index: usize, field: &'static str, s: &str, max: usize) -> Result<(), ResourceError> {
    if s.len() > max {
        return Err(ResourceError::FieldTooLong {
            entry: index,
            field,
            len: s.len(),
            max,
        });
    }
    Ok(())
}

/// Point size encoded in the trailing digits of a font resource name.
///
/// The name must end in one or more ASCII digits preceded by at least one
/// non-digit: `"GOTHIC_24"` and `"Arial21"` are valid, `"Arial"` and `"21"`
/// are not. Sizes that do not fit an `i32` are rejected as well.
pub fn font_point_size(name: &str) -> Option<i32> {
    let digits_start = name
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i)?;
    if digits_start == 0 {
        return None;
    }
    name[digits_start..].parse().ok()
}

// ---------------------------------------------------------------------------
// Manifest
// ---------------------------------------------------------------------------

/// A fully validated resource manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: Vec<ResourceEntry>,
}

impl Manifest {
    /// Parse and validate raw manifest bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ResourceError> {
        let root: Value = serde_json::from_slice(bytes).map_err(ResourceError::MalformedManifest)?;

        let resources = root
            .get("resources")
            .filter(|v| v.is_object())
            .ok_or_else(|| ResourceError::Schema {
                location: "manifest".to_owned(),
                key: "resources",
                expected: "object",
            })?;

        let media = resources
            .get("media")
            .and_then(Value::as_array)
            .ok_or_else(|| ResourceError::Schema {
                location: "resources".to_owned(),
                key: "media",
                expected: "array",
            })?;

        let entries = media
            .iter()
            .enumerate()
            .map(|(i, value)| ResourceEntry::validate(i, value))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(entries = entries.len(), "resource map validated");
        Ok(Self { entries })
    }

    /// Read and validate the manifest at `path`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ResourceError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(|e| ResourceError::io("read resource map", path, e))?;
        Self::from_slice(&bytes)
    }

    /// Build a manifest from already-validated entries.
    pub fn from_entries(entries: Vec<ResourceEntry>) -> Self {
        Self { entries }
    }

    /// Entries in declaration order.
    pub fn entries(&self) -> &[ResourceEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether `media` is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
