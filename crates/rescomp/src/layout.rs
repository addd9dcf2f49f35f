//! Output slot and header symbol assignment.
//!
//! [`ResourceLayout::plan`] folds over the validated manifest carrying the
//! next free output index and the symbols emitted so far. Every entry claims
//! [`ResourceKind::slot_count`] consecutive slots and exactly one symbol per
//! slot:
//!
//! | kind | slots | symbols |
//! |---|---|---|
//! | `raw`, `png`, `font` | `i` | `NAME` |
//! | `png-trans` | `i`, `i + 1` | `NAME_WHITE`, `NAME_BLACK` |
//!
//! The artifact dispatcher and the header generator both walk the resulting
//! layout, which is what keeps file `<i>` and the `i`-th header constant
//! describing the same resource.

use std::collections::HashSet;

use serde::Serialize;

use crate::manifest::{Manifest, ResourceKind};
use crate::ResourceError;

/// Suffix of the white-plane symbol of a png-trans resource.
pub const WHITE_SUFFIX: &str = "_WHITE";

/// Suffix of the black-plane symbol of a png-trans resource.
pub const BLACK_SUFFIX: &str = "_BLACK";

// ---------------------------------------------------------------------------
// PlannedResource
// ---------------------------------------------------------------------------

/// A manifest entry with its first output slot assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedResource {
    /// Zero-based position of the entry in `resources.media`.
    pub entry_index: usize,
    /// Resource name from the manifest.
    pub name: String,
    /// Source file, relative to the project's `resources/` directory.
    pub file: String,
    /// Resource type.
    pub kind: ResourceKind,
    /// First output slot. png-trans also owns `output_index + 1`.
    pub output_index: usize,
}

impl PlannedResource {
    /// Every slot this resource writes, in order.
    pub fn output_indices(&self) -> std::ops::Range<usize> {
        self.output_index..self.output_index + self.kind.slot_count()
    }
}

// ---------------------------------------------------------------------------
// ResourceSymbol
// ---------------------------------------------------------------------------

/// One header constant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceSymbol {
    /// Symbol name without the `RESOURCE_ID_` prefix.
    pub symbol: String,
    /// Output slot (artifact file name) the symbol refers to.
    pub output_index: usize,
    /// Value of the header constant: `output_index + first_resource_id`.
    pub resource_id: u64,
    /// Zero-based entry that produced the symbol.
    pub entry_index: usize,
}

// ---------------------------------------------------------------------------
// ResourceLayout
// ---------------------------------------------------------------------------

/// The planned output of a compile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResourceLayout {
    resources: Vec<PlannedResource>,
    symbols: Vec<ResourceSymbol>,
}

/// Fold accumulator for [`ResourceLayout::plan`].
#[derive(Default)]
struct PlanState {
    first_resource_id: u32,
    next_index: usize,
    layout: ResourceLayout,
    seen: HashSet<String>,
}

impl PlanState {
    fn push_symbol(&mut self, entry_index: usize, symbol: String) -> Result<(), ResourceError> {
        if !self.seen.insert(symbol.clone()) {
            return Err(ResourceError::DuplicateSymbol {
                entry: entry_index,
                symbol,
            });
        }
        self.layout.symbols.push(ResourceSymbol {
            symbol,
            output_index: self.next_index,
            resource_id: u64::from(self.first_resource_id) + self.next_index as u64,
            entry_index,
        });
        self.next_index += 1;
        Ok(())
    }
}

impl ResourceLayout {
    /// Assign output slots and header symbols to every manifest entry.
    ///
    /// Slot `i` gets the id `first_resource_id + i`, matching the values the
    /// generated header assigns.
    ///
    /// Fails with [`ResourceError::DuplicateSymbol`] if two slots would
    /// produce the same header constant.
    pub fn plan(manifest: &Manifest, first_resource_id: u32) -> Result<Self, ResourceError> {
        let initial = PlanState {
            first_resource_id,
            ..PlanState::default()
        };
        let state = manifest.entries().iter().enumerate().try_fold(
            initial,
            |mut state, (entry_index, entry)| {
                state.layout.resources.push(PlannedResource {
                    entry_index,
                    name: entry.name.clone(),
                    file: entry.file.clone(),
                    kind: entry.kind,
                    output_index: state.next_index,
                });

                match entry.kind {
                    ResourceKind::PngTrans => {
                        state.push_symbol(entry_index, format!("{}{WHITE_SUFFIX}", entry.name))?;
                        state.push_symbol(entry_index, format!("{}{BLACK_SUFFIX}", entry.name))?;
                    }
                    ResourceKind::Raw | ResourceKind::Png | ResourceKind::Font => {
                        state.push_symbol(entry_index, entry.name.clone())?;
                    }
                }
                Ok::<_, ResourceError>(state)
            },
        )?;

        tracing::debug!(
            resources = state.layout.resources.len(),
            slots = state.next_index,
            "resource layout planned"
        );
        Ok(state.layout)
    }

    /// Planned resources in manifest order.
    pub fn resources(&self) -> &[PlannedResource] {
        &self.resources
    }

    /// Header symbols in slot order.
    pub fn symbols(&self) -> &[ResourceSymbol] {
        &self.symbols
    }

    /// Total number of output slots (one artifact file name each).
    pub fn slot_count(&self) -> usize {
        self.symbols.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
