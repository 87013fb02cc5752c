//! SHA256 double-hashing and header midstates.

use sha2::digest::generic_array::GenericArray;
use sha2::{Digest, Sha256};

/// SHA256 state after absorbing the first 64-byte block of a header.
pub type Midstate = [u32; 8];

/// SHA256 initial hash values (FIPS 180-4, section 5.3.3).
const SHA256_IV: [u32; 8] = [
    0x6a09e667, 0xbb67ae85, 0x3c6ef372, 0xa54ff53a,
    0x510e527f, 0x9b05688c, 0x1f83d9ab, 0x5be0cd19,
];

/// Bit length of an 80-byte header, as encoded in the final padding block.
const HEADER_BIT_LEN: u64 = 80 * 8;

/// Bitcoin's double SHA256: SHA256(SHA256(data)).
///
/// This is used for block header hashing, transaction IDs, and merkle trees.
#[inline]
pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    let mut result = [0u8; 32];
    result.copy_from_slice(&second);
    result
}

/// Single SHA256 hash.
#[inline]
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let hash = Sha256::digest(data);
    let mut result = [0u8; 32];
    result.copy_from_slice(&hash);
    result
}

fn compress(state: &mut [u32; 8], block: &[u8; 64]) {
    let block = GenericArray::clone_from_slice(block);
    sha2::compress256(state, core::slice::from_ref(&block));
}

/// Compute the SHA256 midstate of the first 64 bytes of a header.
///
/// Only the last 16 bytes of the header (tail of the merkle root, time,
/// bits, nonce) change between nonce trials, so the first compression can
/// be done once per template.
pub fn sha256_midstate(first_block: &[u8; 64]) -> Midstate {
    let mut state = SHA256_IV;
    compress(&mut state, first_block);
    state
}

/// Finish a header's double SHA256 from its midstate and 16-byte tail.
///
/// Equal to `double_sha256(header)` for the 80-byte header whose first
/// 64 bytes produced `midstate`.
pub fn double_sha256_with_midstate(midstate: &Midstate, tail: &[u8; 16]) -> [u8; 32] {
    let mut block = [0u8; 64];
    block[..16].copy_from_slice(tail);
    block[16] = 0x80;
    block[56..].copy_from_slice(&HEADER_BIT_LEN.to_be_bytes());

    let mut state = *midstate;
    compress(&mut state, &block);

    let mut first = [0u8; 32];
    for (chunk, word) in first.chunks_exact_mut(4).zip(state.iter()) {
        chunk.copy_from_slice(&word.to_be_bytes());
    }
    sha256(&first)
}

/// Count leading zero bits of a big-endian (display order) hash.
pub fn count_leading_zeros(hash: &[u8; 32]) -> u32 {
    let mut zeros = 0u32;
    for byte in hash.iter() {
        if *byte == 0 {
            zeros += 8;
        } else {
            zeros += byte.leading_zeros();
            break;
        }
    }
    zeros
}
