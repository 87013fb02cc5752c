//! Bitcoin difficulty target conversion and utilities.

use core::fmt;
use alloc::string::String;
use crate::error::{MinerError, Result};

/// Compact bits of the difficulty-1 target (the genesis block's bits).
pub const GENESIS_BITS: u32 = 0x1d00ffff;

/// Sign flag of the compact encoding; never set for a valid target.
const COMPACT_SIGN_BIT: u32 = 0x0080_0000;

/// Convert compact "bits" representation to a 256-bit target.
///
/// The bits format is: [exponent (1 byte)][mantissa (3 bytes)]
/// Target = mantissa * 256^(exponent - 3)
///
/// The result is a 32-byte big-endian representation of the target.
/// Bits with the sign flag set, or an exponent that would place the
/// mantissa above the most significant byte, are rejected.
pub fn bits_to_target(bits: u32) -> Result<[u8; 32]> {
    let exponent = (bits >> 24) as usize;
    let mantissa = bits & 0x007F_FFFF;

    if bits & COMPACT_SIGN_BIT != 0 || exponent > 32 {
        return Err(MinerError::InvalidCompactEncoding(bits));
    }

    let mut target = [0u8; 32];

    if exponent <= 3 {
        // Mantissa is truncated to fit the lowest `exponent` bytes
        let value = mantissa >> (8 * (3 - exponent));
        target[29..].copy_from_slice(&value.to_be_bytes()[1..]);
    } else {
        let pos = 32 - exponent;
        target[pos..pos + 3].copy_from_slice(&mantissa.to_be_bytes()[1..]);
    }

    Ok(target)
}

/// Convert a 256-bit target back to compact "bits" representation.
///
/// Compact encoding keeps only three significant bytes, so this is lossy:
/// only `bits_to_target(target_to_bits(t))` for a canonical `t` is stable.
pub fn target_to_bits(target: &[u8; 32]) -> u32 {
    let first_nonzero = match target.iter().position(|&b| b != 0) {
        Some(i) => i,
        None => return 0,
    };

    // Number of bytes from the first non-zero byte to the end
    let exponent = (32 - first_nonzero) as u32;

    let mut mantissa: u32 = 0;
    for i in 0..3 {
        let byte = target.get(first_nonzero + i).copied().unwrap_or(0);
        mantissa = (mantissa << 8) | byte as u32;
    }

    // A set high bit would read as the sign flag; move it down a byte
    let (exp_adj, mant_adj) = if mantissa & COMPACT_SIGN_BIT != 0 {
        (exponent + 1, mantissa >> 8)
    } else {
        (exponent, mantissa)
    };

    (exp_adj << 24) | (mant_adj & 0x007F_FFFF)
}

/// A 256-bit proof-of-work target, big-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Target([u8; 32]);

impl Target {
    /// Derive the target encoded by compact bits.
    pub fn from_bits(bits: u32) -> Result<Self> {
        bits_to_target(bits).map(Target)
    }

    /// Wrap a big-endian 32-byte value.
    pub fn from_be_bytes(bytes: [u8; 32]) -> Self {
        Target(bytes)
    }

    /// The target's big-endian bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Re-encode as compact bits.
    pub fn to_bits(&self) -> u32 {
        target_to_bits(&self.0)
    }

    /// Hex of the big-endian bytes, the way `getblocktemplate` prints it.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Difficulty relative to the genesis target.
    pub fn difficulty(&self) -> f64 {
        let current = target_to_f64(&self.0);
        if current == 0.0 {
            return f64::INFINITY;
        }
        // GENESIS_BITS always decodes
        let genesis = bits_to_target(GENESIS_BITS).unwrap_or([0xFF; 32]);
        target_to_f64(&genesis) / current
    }

    /// True if a big-endian hash is at or below this target.
    pub fn is_met_by(&self, hash: &[u8; 32]) -> bool {
        crate::pow::is_below_or_equal_target(hash, &self.0)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Calculate approximate difficulty from bits.
///
/// Difficulty = max_target / current_target
/// Where max_target is the genesis block target (bits = 0x1d00ffff)
pub fn bits_to_difficulty(bits: u32) -> Result<f64> {
    Target::from_bits(bits).map(|t| t.difficulty())
}

/// Convert a 256-bit target to an approximate f64 value.
fn target_to_f64(target: &[u8; 32]) -> f64 {
    target.iter().fold(0.0, |acc, &b| acc * 256.0 + b as f64)
}

/// Format difficulty for display (e.g., "1.23T" for trillion).
pub fn format_difficulty(difficulty: f64) -> String {
    if difficulty >= 1e15 {
        alloc::format!("{:.2}P", difficulty / 1e15)
    } else if difficulty >= 1e12 {
        alloc::format!("{:.2}T", difficulty / 1e12)
    } else if difficulty >= 1e9 {
        alloc::format!("{:.2}G", difficulty / 1e9)
    } else if difficulty >= 1e6 {
        alloc::format!("{:.2}M", difficulty / 1e6)
    } else if difficulty >= 1e3 {
        alloc::format!("{:.2}K", difficulty / 1e3)
    } else {
        alloc::format!("{:.2}", difficulty)
    }
}

/// Estimate average hashes needed to find a block at given difficulty.
pub fn expected_hashes(difficulty: f64) -> f64 {
    // On average, need difficulty * 2^32 hashes
    difficulty * 4_294_967_296.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bits_to_target_genesis() {
        let target = bits_to_target(GENESIS_BITS).unwrap();

        // exponent 0x1d = 29, mantissa 0x00ffff at offset 32 - 29 = 3
        assert_eq!(
            hex::encode(target),
            "00000000ffff0000000000000000000000000000000000000000000000000000"
        );
        assert_eq!(&target[3..6], &[0x00, 0xff, 0xff]);
    }

    #[test]
    fn test_bits_to_target_high_difficulty() {
        let bits = 0x17034219;
        let target = bits_to_target(bits).unwrap();

        // Exponent = 0x17 = 23, so target starts at byte 32-23 = 9
        for (i, byte) in target.iter().enumerate().take(9) {
            assert_eq!(*byte, 0x00, "byte {} should be 0", i);
        }

        assert_eq!(&target[9..12], &[0x03, 0x42, 0x19]);
        assert!(target[12..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_small_exponents_truncate_mantissa() {
        let target = bits_to_target(0x01123456).unwrap();
        assert_eq!(target[31], 0x12);
        assert!(target[..31].iter().all(|&b| b == 0));

        let target = bits_to_target(0x02123456).unwrap();
        assert_eq!(&target[30..], &[0x12, 0x34]);

        let target = bits_to_target(0x03123456).unwrap();
        assert_eq!(&target[29..], &[0x12, 0x34, 0x56]);

        assert_eq!(bits_to_target(0x00123456).unwrap(), [0u8; 32]);
    }

    #[test]
    fn test_sign_bit_rejected() {
        assert_eq!(
            bits_to_target(0x1d80ffff),
            Err(MinerError::InvalidCompactEncoding(0x1d80ffff))
        );
    }

    #[test]
    fn test_exponent_out_of_range_rejected() {
        assert!(bits_to_target(0x2000ffff).is_ok());
        assert_eq!(
            bits_to_target(0x2100ffff),
            Err(MinerError::InvalidCompactEncoding(0x2100ffff))
        );
    }

    #[test]
    fn test_bits_roundtrip() {
        let test_cases = [
            0x1d00ffff, // Genesis
            0x17034219, // High difficulty
            0x1b0404cb, // Medium difficulty
            0x207fffff, // Regtest
        ];

        for &bits in &test_cases {
            let target = bits_to_target(bits).unwrap();
            let recovered = target_to_bits(&target);
            assert_eq!(bits, recovered, "Roundtrip failed for bits {:08x}", bits);
        }
    }

    #[test]
    fn test_target_to_bits_normalizes_high_bit() {
        let mut target = [0u8; 32];
        target[4] = 0x80;
        let bits = target_to_bits(&target);
        assert_eq!(bits, 0x1d008000);
        assert_eq!(bits_to_target(bits).unwrap(), target);
    }

    #[test]
    fn test_zero_target() {
        assert_eq!(target_to_bits(&[0u8; 32]), 0);
    }

    #[test]
    fn test_difficulty_calculation() {
        let genesis_diff = bits_to_difficulty(GENESIS_BITS).unwrap();
        assert!((genesis_diff - 1.0).abs() < 1e-9);

        // Block 100000 had difficulty ~14484.16
        let diff = bits_to_difficulty(0x1b04864c).unwrap();
        assert!((diff - 14484.16).abs() < 0.01);
    }

    #[test]
    fn test_format_difficulty() {
        assert_eq!(format_difficulty(1.0), "1.00");
        assert_eq!(format_difficulty(14484.16), "14.48K");
        assert_eq!(format_difficulty(1.2e14), "120.00T");
    }

    #[test]
    fn test_target_display() {
        let target = Target::from_bits(GENESIS_BITS).unwrap();
        assert_eq!(
            alloc::format!("{}", target),
            "00000000ffff0000000000000000000000000000000000000000000000000000"
        );
        assert_eq!(target.to_bits(), GENESIS_BITS);
    }
}
