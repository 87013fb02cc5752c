//! Hex and byte-order helpers.
//!
//! Nothing here reverses bytes implicitly. Nodes print hashes in display
//! (big-endian) order while the wire carries them reversed, so every caller
//! that crosses that boundary does it explicitly with [`display_hex_to_hash`]
//! or [`hash_to_display_hex`].

use alloc::string::String;
use alloc::vec::Vec;
use crate::error::{MinerError, Result};

/// Encode bytes as lowercase hex, in array order.
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Decode a hex string, two characters per byte, left to right.
///
/// Fails with [`MinerError::InvalidEncoding`] on odd length or any
/// non-hex character.
pub fn hex_to_bytes(s: &str) -> Result<Vec<u8>> {
    Ok(hex::decode(s)?)
}

/// Decode a hex string that must hold exactly 32 bytes.
pub fn hex_to_hash(s: &str) -> Result<[u8; 32]> {
    let bytes = hex_to_bytes(s)?;
    if bytes.len() != 32 {
        return Err(MinerError::SizeMismatch {
            expected: 32,
            got: bytes.len(),
        });
    }
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&bytes);
    Ok(hash)
}

/// Reverse the byte order of a 32-byte array.
#[inline]
pub fn reverse_bytes(bytes: &[u8; 32]) -> [u8; 32] {
    let mut reversed = *bytes;
    reversed.reverse();
    reversed
}

/// Decode a hash printed by the node (display order) into internal order.
pub fn display_hex_to_hash(s: &str) -> Result<[u8; 32]> {
    hex_to_hash(s).map(|h| reverse_bytes(&h))
}

/// Convert an internal-order hash to its display hex.
pub fn hash_to_display_hex(hash: &[u8; 32]) -> String {
    hex::encode(reverse_bytes(hash))
}
