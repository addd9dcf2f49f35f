//! Generation of `resource_ids.auto.h`.
//!
//! The header is a fixed template with the resource constants injected into
//! a `ResourceId` enum. `INVALID_RESOURCE` always owns 0; the first real
//! constant is pinned to its planned
//! [`resource_id`](crate::layout::ResourceSymbol::resource_id) and the rest
//! follow implicitly, so a resource's id is its output index plus
//! [`HeaderOptions::first_resource_id`].

use std::path::Path;

use crate::layout::ResourceLayout;
use crate::ResourceError;

/// File name of the generated header.
pub const HEADER_FILE_NAME: &str = "resource_ids.auto.h";

/// Prefix of every generated constant.
pub const SYMBOL_PREFIX: &str = "RESOURCE_ID_";

/// Options for rendering the header template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderOptions {
    /// Value of the first real resource constant, passed to
    /// [`ResourceLayout::plan`]. `INVALID_RESOURCE` is 0, so the default of 1
    /// keeps every id distinct from the sentinel.
    pub first_resource_id: u32,
    /// Name the app's `main` is redefined to, so it does not clash with the
    /// simulator host's own entry point.
    pub entry_point_alias: String,
}

impl Default for HeaderOptions {
    fn default() -> Self {
        Self {
            first_resource_id: 1,
            entry_point_alias: "pbl_main".to_owned(),
        }
    }
}

/// Render the header text for `layout`.
///
/// Only the first constant gets an initializer; the values of the others
/// follow from C enum numbering and equal their planned `resource_id`.
pub fn render_header(layout: &ResourceLayout, options: &HeaderOptions) -> String {
    let mut ids = String::new();
    for (n, symbol) in layout.symbols().iter().enumerate() {
        if n == 0 {
            ids.push_str(&format!(
                "\t{SYMBOL_PREFIX}{} = {},\n",
                symbol.symbol, symbol.resource_id
            ));
        } else {
            ids.push_str(&format!("\t{SYMBOL_PREFIX}{},\n", symbol.symbol));
        }
    }

    format!(
        "#pragma once

// AUTOGENERATED BY rescomp
// DO NOT MODIFY
//

#include <stdint.h>
/* The simulator host provides its own entry point. pebble.h includes this
 * file and every app includes pebble.h, so the app's \"main\" is renamed to
 * \"{alias}\" here.
 */
#undef main
#define main {alias}
typedef enum {{
\tINVALID_RESOURCE = 0,
{ids}}} ResourceId;
",
        alias = options.entry_point_alias,
    )
}

/// Render the header for `layout` and write it to `path`.
pub fn write_header(
    path: &Path,
    layout: &ResourceLayout,
    options: &HeaderOptions,
) -> Result<(), ResourceError> {
    let text = render_header(layout, options);
    std::fs::write(path, text).map_err(|e| ResourceError::io("write header file", path, e))?;
    tracing::debug!(
        path = %path.display(),
        symbols = layout.symbols().len(),
        "resource header written"
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
