//! Bitcoin block header model and 80-byte wire codec.

use alloc::string::String;
use crate::encoding::{display_hex_to_hash, hash_to_display_hex, reverse_bytes};
use crate::difficulty::Target;
use crate::error::{MinerError, Result};
use crate::hash::{double_sha256, sha256_midstate, Midstate};
use crate::network::BLOCK_HEADER_SIZE;
use crate::template::BlockTemplate;

/// A Bitcoin block header (80 bytes).
///
/// Hash fields are kept in internal (wire) byte order. Display-order hex
/// from the node is reversed once, when the header is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    /// Block version with BIP9 versionbits.
    pub version: i32,
    /// Hash of the previous block (internal byte order).
    pub prev_block_hash: [u8; 32],
    /// Merkle root of all transactions (internal byte order).
    pub merkle_root: [u8; 32],
    /// Block timestamp (Unix time).
    pub timestamp: u32,
    /// Difficulty target in compact "bits" format.
    pub bits: u32,
    /// Nonce for proof of work.
    pub nonce: u32,
}

impl BlockHeader {
    /// Create a new block header with a zero nonce.
    pub fn new(
        version: i32,
        prev_block_hash: [u8; 32],
        merkle_root: [u8; 32],
        timestamp: u32,
        bits: u32,
    ) -> Self {
        BlockHeader {
            version,
            prev_block_hash,
            merkle_root,
            timestamp,
            bits,
            nonce: 0,
        }
    }

    /// Serialize the block header to 80 bytes.
    pub fn serialize(&self) -> [u8; BLOCK_HEADER_SIZE] {
        let mut header = [0u8; BLOCK_HEADER_SIZE];
        header[..76].copy_from_slice(&self.serialize_without_nonce());

        // Nonce (4 bytes, little-endian)
        header[76..80].copy_from_slice(&self.nonce.to_le_bytes());

        header
    }

    /// Serialize the header without the nonce (76 bytes).
    /// Used for efficient mining where we only change the nonce.
    pub fn serialize_without_nonce(&self) -> [u8; 76] {
        let mut header = [0u8; 76];

        // Version (4 bytes, little-endian)
        header[0..4].copy_from_slice(&self.version.to_le_bytes());

        // Previous block hash (32 bytes, internal byte order)
        header[4..36].copy_from_slice(&self.prev_block_hash);

        // Merkle root (32 bytes, internal byte order)
        header[36..68].copy_from_slice(&self.merkle_root);

        // Timestamp (4 bytes, little-endian)
        header[68..72].copy_from_slice(&self.timestamp.to_le_bytes());

        // Bits (4 bytes, little-endian)
        header[72..76].copy_from_slice(&self.bits.to_le_bytes());

        header
    }

    /// Parse an 80-byte wire header.
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != BLOCK_HEADER_SIZE {
            return Err(MinerError::SizeMismatch {
                expected: BLOCK_HEADER_SIZE,
                got: bytes.len(),
            });
        }

        let word = |at: usize| [bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]];
        let mut prev_block_hash = [0u8; 32];
        prev_block_hash.copy_from_slice(&bytes[4..36]);
        let mut merkle_root = [0u8; 32];
        merkle_root.copy_from_slice(&bytes[36..68]);

        Ok(BlockHeader {
            version: i32::from_le_bytes(word(0)),
            prev_block_hash,
            merkle_root,
            timestamp: u32::from_le_bytes(word(68)),
            bits: u32::from_le_bytes(word(72)),
            nonce: u32::from_le_bytes(word(76)),
        })
    }

    /// Parse a header from its 160-character hex form.
    pub fn from_hex(s: &str) -> Result<Self> {
        Self::deserialize(&crate::encoding::hex_to_bytes(s)?)
    }

    /// Hex of the 80-byte wire form.
    pub fn to_hex(&self) -> String {
        hex::encode(self.serialize())
    }

    /// Compute the block hash (double SHA256), internal byte order.
    pub fn hash(&self) -> [u8; 32] {
        double_sha256(&self.serialize())
    }

    /// The block hash in display (big-endian) byte order.
    pub fn display_hash(&self) -> [u8; 32] {
        reverse_bytes(&self.hash())
    }

    /// The block hash as the node prints it.
    pub fn display_hash_hex(&self) -> String {
        hash_to_display_hex(&self.hash())
    }

    /// SHA256 midstate of the first 64 header bytes.
    pub fn midstate(&self) -> Midstate {
        let serialized = self.serialize();
        let mut first = [0u8; 64];
        first.copy_from_slice(&serialized[..64]);
        sha256_midstate(&first)
    }

    /// The 16 bytes hashed after the midstate, for a given nonce.
    pub fn tail_with_nonce(&self, nonce: u32) -> [u8; 16] {
        let mut tail = [0u8; 16];
        tail[..4].copy_from_slice(&self.merkle_root[28..]);
        tail[4..8].copy_from_slice(&self.timestamp.to_le_bytes());
        tail[8..12].copy_from_slice(&self.bits.to_le_bytes());
        tail[12..].copy_from_slice(&nonce.to_le_bytes());
        tail
    }

    /// Get the target encoded by this header's bits.
    pub fn target(&self) -> Result<Target> {
        Target::from_bits(self.bits)
    }

    /// Copy of this header with a different nonce.
    pub fn with_nonce(&self, nonce: u32) -> Self {
        BlockHeader { nonce, ..*self }
    }

    /// Record the winning nonce.
    pub fn set_nonce(&mut self, nonce: u32) {
        self.nonce = nonce;
    }
}

/// Build the header for a template and its computed merkle root.
///
/// `previousblockhash` arrives in display order and is reversed here;
/// `bits` was already parsed as a hex integer by the template and is
/// copied as-is.
pub fn parse_header(template: &BlockTemplate, merkle_root: [u8; 32]) -> Result<BlockHeader> {
    let prev_block_hash = display_hex_to_hash(&template.previous_block_hash)?;
    Ok(BlockHeader::new(
        template.version,
        prev_block_hash,
        merkle_root,
        template.curtime,
        template.bits_value,
    ))
}
