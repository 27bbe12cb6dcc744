//! # Digest Module
//!
//! Content checksum shown alongside an uploaded file.
//!
//! The checksum is an identifier for display and audit only. By default it
//! is FNV-1a 64-bit. Enable the `crypto-hash` feature to use BLAKE3 instead.

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0100_0000_01b3;

/// FNV-1a 64-bit hash of `bytes`.
#[must_use]
pub fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for b in bytes {
        hash ^= u64::from(*b);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Lowercase hex checksum of `bytes`.
///
/// 16 characters with the default FNV-1a, 64 with `crypto-hash`.
#[cfg(not(feature = "crypto-hash"))]
#[must_use]
pub fn checksum_hex(bytes: &[u8]) -> String {
    format!("{:016x}", fnv1a_64(bytes))
}

/// Lowercase hex checksum of `bytes`.
///
/// 16 characters with the default FNV-1a, 64 with `crypto-hash`.
#[cfg(feature = "crypto-hash")]
#[must_use]
pub fn checksum_hex(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

// =============================================================================
// TESTS
// =============================================================================
