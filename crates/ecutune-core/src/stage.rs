//! # Stage Module
//!
//! Stage presets and their application to a [`ParameterSet`].
//!
//! A preset is a bundle of four multipliers, stored as integer percentages.
//! Application dispatches on each record's [`Category`] tag:
//!
//! | Category | Result |
//! |----------|--------|
//! | Boost | value x boost, 2 decimals |
//! | Fuel | value x fuel, 0 decimals |
//! | Timing | value x timing, 1 decimal |
//! | Torque | value x torque, 0 decimals |
//! | Speed, Egr | 0 |
//! | Other | unchanged |

use crate::parameter::{Category, ParameterKey, ParameterSet};
use crate::quantity::Quantity;
use crate::{EcuError, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// =============================================================================
// STAGE
// =============================================================================

/// A named tuning stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Stage1,
    Stage2,
    Stage3,
}

impl Stage {
    /// All stages, mildest first.
    pub const ALL: [Self; 3] = [Self::Stage1, Self::Stage2, Self::Stage3];

    /// The wire name, e.g. `"stage1"`.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Stage1 => "stage1",
            Self::Stage2 => "stage2",
            Self::Stage3 => "stage3",
        }
    }

    /// The multiplier bundle for this stage.
    #[must_use]
    pub const fn preset(&self) -> StagePreset {
        match self {
            Self::Stage1 => StagePreset::new(115, 112, 105, 120),
            Self::Stage2 => StagePreset::new(130, 125, 110, 135),
            Self::Stage3 => StagePreset::new(145, 140, 115, 150),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = EcuError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| EcuError::InvalidStage(s.to_string()))
    }
}

// =============================================================================
// PRESET
// =============================================================================

/// Multipliers of a stage, as percentages (115 means x1.15).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StagePreset {
    pub boost: u32,
    pub fuel: u32,
    pub timing: u32,
    pub torque: u32,
}

impl StagePreset {
    const fn new(boost: u32, fuel: u32, timing: u32, torque: u32) -> Self {
        Self {
            boost,
            fuel,
            timing,
            torque,
        }
    }

    /// Transform one value according to its category.
    #[must_use]
    pub fn apply(&self, category: Category, value: Quantity) -> Quantity {
        match category {
            Category::Boost => value.scale_percent(self.boost, 2),
            Category::Fuel => value.scale_percent(self.fuel, 0),
            Category::Timing => value.scale_percent(self.timing, 1),
            Category::Torque => value.scale_percent(self.torque, 0),
            Category::Speed | Category::Egr => Quantity::zero(),
            Category::Other => value,
        }
    }
}

// =============================================================================
// STAGED VALUES
// =============================================================================

/// Result of applying a stage: parameter name to new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StagedValues {
    values: BTreeMap<ParameterKey, Quantity>,
}

impl StagedValues {
    /// Look up one value.
    #[must_use]
    pub fn get(&self, key: ParameterKey) -> Option<Quantity> {
        self.values.get(&key).copied()
    }

    /// Iterate in key order.
    pub fn iter(&self) -> impl Iterator<Item = (ParameterKey, Quantity)> + '_ {
        self.values.iter().map(|(key, value)| (*key, *value))
    }

    /// Number of values. Matches the source set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// =============================================================================
// APPLICATION
// =============================================================================

/// Apply a stage to a parameter set.
pub fn apply_preset(set: &ParameterSet, stage: Stage) -> StagedValues {
    let preset = stage.preset();
    let values = set
        .iter()
        .map(|(key, record)| (key, preset.apply(record.category, record.value)))
        .collect();
    StagedValues { values }
}

/// Apply a stage by name to the currently loaded set.
///
/// # Errors
///
/// - [`EcuError::NotLoaded`] when `current` is `None` (checked first)
/// - [`EcuError::InvalidStage`] when `stage_name` is not a known stage
pub fn apply_stage(current: Option<&ParameterSet>, stage_name: &str) -> Result<StagedValues> {
    let set = current.ok_or(EcuError::NotLoaded)?;
    let stage = stage_name.parse::<Stage>()?;
    Ok(apply_preset(set, stage))
}

// =============================================================================
// TESTS
// =============================================================================
