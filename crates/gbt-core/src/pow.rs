//! Proof-of-work checks.
//!
//! Hashes and targets meet here in big-endian (display) order. A header
//! hash comes out of SHA256 in internal order and is reversed before the
//! comparison; nothing else in the crate compares hashes to targets.

use crate::difficulty::Target;
use crate::encoding::reverse_bytes;
use crate::header::BlockHeader;

/// Check if a hash is at or below a target.
///
/// Both are 256-bit big-endian numbers compared from the most significant
/// byte. Equality counts as meeting the target.
#[inline]
pub fn is_below_or_equal_target(hash: &[u8; 32], target: &[u8; 32]) -> bool {
    hash <= target
}

/// Hash a header and check it against a target.
pub fn header_meets_target(header: &BlockHeader, target: &Target) -> bool {
    target.is_met_by(&header.display_hash())
}

/// Check whether `nonce` solves `header`.
///
/// Returns the block hash in display order when it does.
pub fn verify_solution(header: &BlockHeader, target: &Target, nonce: u32) -> Option<[u8; 32]> {
    let hash = reverse_bytes(&header.with_nonce(nonce).hash());
    if target.is_met_by(&hash) {
        Some(hash)
    } else {
        None
    }
}
