//! # ecutune-core
//!
//! The deterministic Parameter Transformer.
//!
//! Raw file bytes go in, a fixed six-entry [`ParameterSet`] comes out, and a
//! [`Stage`] preset can be applied to produce [`StagedValues`]. Nothing here
//! parses a real firmware format: the "extraction" is a heuristic over the
//! byte length and the first kilobyte of content.
//!
//! ## Design Principles
//!
//! - No async, no I/O. The app layer owns uploads, storage and HTTP.
//! - All ordered collections are `BTreeMap`.
//! - Numbers are fixed-point [`Quantity`] values; stage arithmetic is integer
//!   arithmetic with round-half-up, so results are exact and reproducible.
//! - There is no process-wide state. Callers hold a [`Session`] value.

pub mod digest;
pub mod export;
pub mod parameter;
pub mod quantity;
pub mod session;
pub mod stage;

pub use digest::checksum_hex;
pub use export::{export_file_name, render_export};
pub use parameter::{
    Category, ParameterKey, ParameterRecord, ParameterSet, derive_parameters, detect_ecu_type,
};
pub use quantity::Quantity;
pub use session::{LoadedFile, Session};
pub use stage::{Stage, StagePreset, StagedValues, apply_preset, apply_stage};

use thiserror::Error;

// =============================================================================
// ERROR TYPE
// =============================================================================

/// Errors from the Parameter Transformer.
///
/// Both are local validation failures. A failed call never changes the
/// caller's [`Session`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EcuError {
    /// Parameters or a stage were requested before any file was loaded.
    #[error("No ECU file loaded")]
    NotLoaded,

    /// The stage name is not one of the known presets.
    #[error("Invalid stage: {0}")]
    InvalidStage(String),
}

/// Result alias for core operations.
pub type Result<T> = std::result::Result<T, EcuError>;
