//! # Session Module
//!
//! The caller-held slot for the currently loaded file.
//!
//! A [`Session`] owns at most one [`LoadedFile`]. Loading replaces it
//! wholesale; stage application only reads it. There is no global instance:
//! the HTTP layer keeps one session per client and the CLI builds one per
//! command.

use crate::digest::checksum_hex;
use crate::parameter::{ParameterSet, derive_parameters, detect_ecu_type};
use crate::stage::{StagedValues, apply_stage};
use crate::{EcuError, Result};
use serde::Serialize;

/// A file after pseudo-extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadedFile {
    pub name: String,
    pub size: usize,
    pub checksum: String,
    #[serde(rename = "type")]
    pub ecu_type: String,
    pub parameters: ParameterSet,
}

impl LoadedFile {
    /// Analyze `bytes`. Never fails.
    #[must_use]
    pub fn analyze(bytes: &[u8], name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: bytes.len(),
            checksum: checksum_hex(bytes),
            ecu_type: detect_ecu_type(bytes),
            parameters: derive_parameters(bytes),
        }
    }
}

/// Holds the current file for one caller.
#[derive(Debug, Clone, Default)]
pub struct Session {
    current: Option<LoadedFile>,
}

impl Session {
    /// Create an empty session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a file, replacing any previous one.
    pub fn load(&mut self, bytes: &[u8], name: impl Into<String>) -> &LoadedFile {
        self.current.insert(LoadedFile::analyze(bytes, name))
    }

    /// The current file, if any.
    #[must_use]
    pub fn current_file(&self) -> Option<&LoadedFile> {
        self.current.as_ref()
    }

    /// Parameters of the current file.
    ///
    /// # Errors
    ///
    /// [`EcuError::NotLoaded`] when nothing has been loaded.
    pub fn current_parameters(&self) -> Result<&ParameterSet> {
        self.current
            .as_ref()
            .map(|file| &file.parameters)
            .ok_or(EcuError::NotLoaded)
    }

    /// Apply a stage by name to the current file's parameters.
    ///
    /// The session is not modified, whether or not this succeeds.
    pub fn apply_stage(&self, stage_name: &str) -> Result<StagedValues> {
        apply_stage(self.current.as_ref().map(|file| &file.parameters), stage_name)
    }
}

// =============================================================================
// TESTS
// =============================================================================
