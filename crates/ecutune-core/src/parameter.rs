//! # Parameter Module
//!
//! Pseudo-extraction of tuning parameters from raw file bytes.
//!
//! Nothing here reads a real map or calibration table. The ECU label comes
//! from a vendor token in the first kilobyte or from the exact file size, and
//! the six parameter values are fixed bases nudged by `len % K` so that
//! different files show slightly different numbers.

use crate::quantity::Quantity;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

// =============================================================================
// DETECTION CONSTANTS
// =============================================================================

/// Number of leading bytes scanned for a vendor token.
pub const HEADER_SCAN_LEN: usize = 1024;

/// Vendor tokens in match order, with the label they select.
pub const VENDOR_TOKENS: [(&str, &str); 4] = [
    ("BOSCH", "Bosch EDC17"),
    ("SIEMENS", "Siemens SID"),
    ("DELPHI", "Delphi DCM"),
    ("CONTINENTAL", "Continental SIMOS"),
];

/// Exact file sizes with a known label.
pub const SIZE_LABELS: [(usize, &str); 4] = [
    (1_048_576, "Generic ECU (1MB)"),
    (2_097_152, "Generic ECU (2MB)"),
    (524_288, "Generic ECU (512KB)"),
    (262_144, "Generic ECU (256KB)"),
];

// =============================================================================
// PARAMETER KEY
// =============================================================================

/// The six known parameter names.
///
/// Declaration order is the iteration order of a [`ParameterSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKey {
    BoostPressure,
    FuelPressure,
    InjectionTiming,
    SpeedLimiter,
    TorqueLimiter,
    EgrValve,
}

impl ParameterKey {
    /// All keys in set order.
    pub const ALL: [Self; 6] = [
        Self::BoostPressure,
        Self::FuelPressure,
        Self::InjectionTiming,
        Self::SpeedLimiter,
        Self::TorqueLimiter,
        Self::EgrValve,
    ];

    /// The snake_case wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::BoostPressure => "boost_pressure",
            Self::FuelPressure => "fuel_pressure",
            Self::InjectionTiming => "injection_timing",
            Self::SpeedLimiter => "speed_limiter",
            Self::TorqueLimiter => "torque_limiter",
            Self::EgrValve => "egr_valve",
        }
    }
}

impl fmt::Display for ParameterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// CATEGORY
// =============================================================================

/// How a stage preset treats a parameter.
///
/// Stored on each parameter definition, so stage application never has to
/// guess from the key name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Boost,
    Fuel,
    Timing,
    Torque,
    /// Zeroed by every stage preset.
    Speed,
    /// Zeroed by every stage preset.
    Egr,
    /// Passed through unchanged.
    Other,
}

// =============================================================================
// DEFINITIONS
// =============================================================================

/// Static description of one parameter.
struct Definition {
    key: ParameterKey,
    category: Category,
    /// Base value as a raw fixed-point integer at `decimals` places.
    base: u64,
    decimals: u8,
    /// `(modulus, multiplier, divisor)`: adds `(len % modulus) * multiplier / divisor` raw units.
    perturbation: Option<(u64, u64, u64)>,
    unit: &'static str,
    address: &'static str,
    description: &'static str,
}

const DEFINITIONS: [Definition; 6] = [
    Definition {
        key: ParameterKey::BoostPressure,
        category: Category::Boost,
        base: 1200, // 1.200 bar
        decimals: 3,
        perturbation: Some((100, 1, 1)),
        unit: "bar",
        address: "0x12345",
        description: "Maximum turbocharger boost pressure",
    },
    Definition {
        key: ParameterKey::FuelPressure,
        category: Category::Fuel,
        base: 1600,
        decimals: 0,
        perturbation: Some((200, 1, 2)),
        unit: "bar",
        address: "0x23456",
        description: "Common rail fuel injection pressure",
    },
    Definition {
        key: ParameterKey::InjectionTiming,
        category: Category::Timing,
        base: 850, // 8.50 degrees
        decimals: 2,
        perturbation: Some((50, 5, 1)),
        unit: "°BTDC",
        address: "0x34567",
        description: "Main injection timing advance",
    },
    Definition {
        key: ParameterKey::SpeedLimiter,
        category: Category::Speed,
        base: 250,
        decimals: 0,
        perturbation: None,
        unit: "km/h",
        address: "0x45678",
        description: "Maximum vehicle speed limit",
    },
    Definition {
        key: ParameterKey::TorqueLimiter,
        category: Category::Torque,
        base: 400,
        decimals: 0,
        perturbation: None,
        unit: "Nm",
        address: "0x56789",
        description: "Maximum engine torque limit",
    },
    Definition {
        key: ParameterKey::EgrValve,
        category: Category::Egr,
        base: 100,
        decimals: 0,
        perturbation: None,
        unit: "%",
        address: "0x6789A",
        description: "Exhaust gas recirculation valve opening",
    },
];

impl Definition {
    fn record_for_len(&self, len: u64) -> ParameterRecord {
        let offset = self
            .perturbation
            .map(|(modulus, multiplier, divisor)| (len % modulus) * multiplier / divisor)
            .unwrap_or(0);
        ParameterRecord {
            value: Quantity::new(self.base + offset, self.decimals),
            unit: self.unit.to_string(),
            address: self.address.to_string(),
            description: self.description.to_string(),
            category: self.category,
        }
    }
}

// =============================================================================
// RECORD AND SET
// =============================================================================

/// One pseudo-extracted parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterRecord {
    pub value: Quantity,
    pub unit: String,
    /// Opaque address token. Not a real memory location.
    pub address: String,
    pub description: String,
    pub category: Category,
}

/// The fixed six-entry parameter mapping of a loaded file.
///
/// Only [`derive_parameters`] builds one, so every set holds exactly the keys
/// in [`ParameterKey::ALL`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ParameterSet {
    records: BTreeMap<ParameterKey, ParameterRecord>,
}

impl ParameterSet {
    /// Look up one parameter.
    #[must_use]
    pub fn get(&self, key: ParameterKey) -> Option<&ParameterRecord> {
        self.records.get(&key)
    }

    /// Iterate in key order.
    pub fn iter(&self) -> impl Iterator<Item = (ParameterKey, &ParameterRecord)> {
        self.records.iter().map(|(key, record)| (*key, record))
    }

    /// Number of parameters. Always six.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Always false; kept for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// =============================================================================
// DETECTION AND DERIVATION
// =============================================================================

/// Guess a display label for the file.
///
/// Files longer than [`HEADER_SCAN_LEN`] are first searched for a vendor
/// token in their leading bytes, ignoring ASCII case. Otherwise the exact
/// size is matched against [`SIZE_LABELS`].
#[must_use]
pub fn detect_ecu_type(bytes: &[u8]) -> String {
    if bytes.len() > HEADER_SCAN_LEN {
        let header = bytes[..HEADER_SCAN_LEN].to_ascii_uppercase();
        for (token, label) in VENDOR_TOKENS {
            if contains(&header, token.as_bytes()) {
                return label.to_string();
            }
        }
    }

    SIZE_LABELS
        .iter()
        .find(|(size, _)| *size == bytes.len())
        .map(|(_, label)| (*label).to_string())
        .unwrap_or_else(|| format!("Unknown ECU ({} bytes)", bytes.len()))
}

/// Derive the parameter set for a file.
///
/// Depends only on the byte length, so identical input always produces an
/// identical set.
#[must_use]
pub fn derive_parameters(bytes: &[u8]) -> ParameterSet {
    let len = bytes.len() as u64;
    let records = DEFINITIONS
        .iter()
        .map(|def| (def.key, def.record_for_len(len)))
        .collect();
    ParameterSet { records }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

// =============================================================================
// TESTS
// =============================================================================
