//! Nonce search capability.
//!
//! Real searches run on a GPU or SIMD kernel outside this crate. They plug
//! in through [`SearchKernel`]; [`CpuKernel`] is the portable reference
//! used as a fallback and in tests.

use tracing::{info, trace};
use crate::difficulty::Target;
use crate::encoding::reverse_bytes;
use crate::hash::double_sha256_with_midstate;
use crate::header::BlockHeader;

/// Nonces tried per [`CpuKernel`] batch unless configured otherwise.
pub const DEFAULT_BATCH_SIZE: u32 = 100_000;

/// Outcome of one search batch, returned by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchResult {
    /// Whether `nonce` solves the header.
    pub found: bool,
    /// The winning nonce when `found`, otherwise the last nonce tried.
    pub nonce: u32,
    /// Hash for `nonce`, big-endian (display order).
    pub hash: [u8; 32],
    /// Number of nonces hashed in this batch.
    pub hashes_attempted: u64,
    /// Lowest hash seen in the batch, big-endian. `None` if nothing was hashed.
    pub best_hash: Option<[u8; 32]>,
}

impl SearchResult {
    /// A batch that hashed nothing.
    pub fn empty() -> Self {
        SearchResult {
            found: false,
            nonce: 0,
            hash: [0u8; 32],
            hashes_attempted: 0,
            best_hash: None,
        }
    }

    /// A batch that ended on a solution.
    ///
    /// The solution is the best sample whenever it beats `best_hash`.
    pub fn solved(nonce: u32, hash: [u8; 32], hashes: u64, best_hash: Option<[u8; 32]>) -> Self {
        let best = match best_hash {
            Some(best) if best < hash => best,
            _ => hash,
        };
        SearchResult {
            found: true,
            nonce,
            hash,
            hashes_attempted: hashes,
            best_hash: Some(best),
        }
    }

    /// A batch that ran out of nonces without a solution.
    pub fn exhausted(last_nonce: u32, last_hash: [u8; 32], hashes: u64, best_hash: Option<[u8; 32]>) -> Self {
        SearchResult {
            found: false,
            nonce: last_nonce,
            hash: last_hash,
            hashes_attempted: hashes,
            best_hash,
        }
    }

    /// First nonce after this batch, or `None` once the 32-bit space is spent.
    pub fn next_nonce(&self, start_nonce: u32) -> Option<u32> {
        u32::try_from(start_nonce as u64 + self.hashes_attempted).ok()
    }
}

/// A nonce-search backend.
///
/// The header and target are borrowed read-only for the whole batch, so a
/// kernel can never observe a half-updated job.
pub trait SearchKernel {
    /// Try nonces from `start_nonce` and report what was found.
    fn search(&mut self, header: &BlockHeader, target: &Target, start_nonce: u32) -> SearchResult;
}

/// Single-lane CPU search using the header midstate.
#[derive(Debug, Clone)]
pub struct CpuKernel {
    batch_size: u32,
}

impl CpuKernel {
    /// Create a kernel that tries `batch_size` nonces per call.
    pub fn new(batch_size: u32) -> Self {
        CpuKernel { batch_size }
    }

    /// Nonces tried per call.
    pub fn batch_size(&self) -> u32 {
        self.batch_size
    }
}

impl Default for CpuKernel {
    fn default() -> Self {
        CpuKernel::new(DEFAULT_BATCH_SIZE)
    }
}

impl SearchKernel for CpuKernel {
    fn search(&mut self, header: &BlockHeader, target: &Target, start_nonce: u32) -> SearchResult {
        let midstate = header.midstate();
        let end = (start_nonce as u64 + self.batch_size as u64).min(u32::MAX as u64 + 1);

        let mut result = SearchResult::empty();

        for nonce in start_nonce as u64..end {
            let nonce = nonce as u32;
            let hash = reverse_bytes(&double_sha256_with_midstate(
                &midstate,
                &header.tail_with_nonce(nonce),
            ));
            result.hashes_attempted += 1;

            if target.is_met_by(&hash) {
                info!(nonce, hash = %hex::encode(hash), "found solution");
                return SearchResult::solved(nonce, hash, result.hashes_attempted, result.best_hash);
            }

            if result.best_hash.map_or(true, |best| hash < best) {
                result.best_hash = Some(hash);
            }
            result.nonce = nonce;
            result.hash = hash;
        }

        trace!(start_nonce, hashes = result.hashes_attempted, "batch exhausted");
        SearchResult::exhausted(result.nonce, result.hash, result.hashes_attempted, result.best_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pow::verify_solution;

    fn header(bits: u32) -> BlockHeader {
        BlockHeader::new(0x20000000, [0x11; 32], [0x22; 32], 1700000000, bits)
    }

    #[test]
    fn test_finds_easy_solution() {
        // Regtest difficulty: roughly every other hash qualifies
        let header = header(0x207fffff);
        let target = header.target().unwrap();

        let result = CpuKernel::new(1_000).search(&header, &target, 0);

        assert!(result.found);
        assert_eq!(result.hashes_attempted, result.nonce as u64 + 1);
        assert_eq!(verify_solution(&header, &target, result.nonce), Some(result.hash));
        assert!(result.best_hash.unwrap() <= result.hash);
    }

    #[test]
    fn test_exhausts_impossible_target() {
        let header = header(0x03000001);
        let target = header.target().unwrap();

        let result = CpuKernel::new(64).search(&header, &target, 500);

        assert!(!result.found);
        assert_eq!(result.hashes_attempted, 64);
        assert_eq!(result.nonce, 563);
        assert_eq!(reverse_bytes(&header.with_nonce(563).hash()), result.hash);
        assert_eq!(result.next_nonce(500), Some(564));

        let best = (500..564)
            .map(|nonce| reverse_bytes(&header.with_nonce(nonce).hash()))
            .min();
        assert_eq!(result.best_hash, best);
    }

    #[test]
    fn test_clamps_at_end_of_nonce_space() {
        let header = header(0x03000001);
        let target = header.target().unwrap();

        let result = CpuKernel::new(100).search(&header, &target, u32::MAX - 4);

        assert_eq!(result.hashes_attempted, 5);
        assert_eq!(result.next_nonce(u32::MAX - 4), None);
    }

    #[test]
    fn test_solved_keeps_lowest_best_hash() {
        let solved = SearchResult::solved(9, [0x10; 32], 10, Some([0x20; 32]));
        assert_eq!(solved.best_hash, Some([0x10; 32]));

        let solved = SearchResult::solved(9, [0x10; 32], 10, Some([0x01; 32]));
        assert_eq!(solved.best_hash, Some([0x01; 32]));
        assert_eq!(solved.hash, [0x10; 32]);

        assert_eq!(SearchResult::empty().best_hash, None);
    }
}
