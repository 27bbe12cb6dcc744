//! # Export Module
//!
//! Placeholder output for "exporting" a tuned file.
//!
//! No binary is rewritten. The export is a short text document naming the
//! source file and, when a stage was requested, the staged values. The
//! timestamp is supplied by the caller so the output stays deterministic.

use crate::session::LoadedFile;
use crate::stage::{Stage, StagedValues};

const BIN_SUFFIX: &str = ".bin";
const MODIFIED_SUFFIX: &str = "_modified.bin";

/// Name for the exported file.
///
/// `"golf.bin"` becomes `"golf_modified.bin"`; a name without a `.bin`
/// extension gets `_modified.bin` appended.
#[must_use]
pub fn export_file_name(name: &str) -> String {
    let stem = name
        .len()
        .checked_sub(BIN_SUFFIX.len())
        .and_then(|cut| {
            name.get(cut..)
                .filter(|ext| ext.eq_ignore_ascii_case(BIN_SUFFIX))
                .and_then(|_| name.get(..cut))
        })
        .unwrap_or(name);
    format!("{}{}", stem, MODIFIED_SUFFIX)
}

/// Render the placeholder export body.
#[must_use]
pub fn render_export(
    file: &LoadedFile,
    staged: Option<(Stage, &StagedValues)>,
    timestamp: &str,
) -> Vec<u8> {
    let mut out = String::new();
    out.push_str(&format!("Modified ECU file - {}\n", timestamp));
    out.push_str(&format!("source={}\n", file.name));
    out.push_str(&format!("checksum={}\n", file.checksum));
    out.push_str(&format!("type={}\n", file.ecu_type));

    if let Some((stage, values)) = staged {
        out.push_str(&format!("stage={}\n", stage));
        for (key, value) in values.iter() {
            out.push_str(&format!("{}={}\n", key, value));
        }
    }

    out.into_bytes()
}

// =============================================================================
// TESTS
// =============================================================================
