//! Candidate block construction and serialization for submission.

use alloc::string::String;
use alloc::vec::Vec;
use tracing::{debug, info};
use crate::difficulty::Target;
use crate::encoding::hex_to_bytes;
use crate::error::{MinerError, Result};
use crate::hash::double_sha256;
use crate::header::{parse_header, BlockHeader};
use crate::merkle::{compute_merkle_root, leaves_from_template};
use crate::network::BLOCK_HEADER_SIZE;
use crate::pow::verify_solution;
use crate::template::BlockTemplate;

/// A coinbase transaction built outside this crate.
///
/// Address decoding and coinbase construction belong to the caller; the
/// pipeline only needs the serialized bytes and the txid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoinbaseTx {
    /// Bytes placed in the block.
    pub raw: Vec<u8>,
    /// Transaction ID (internal byte order).
    pub txid: [u8; 32],
}

impl CoinbaseTx {
    /// Wrap a legacy-serialized coinbase; the txid is its double SHA256.
    pub fn from_raw(raw: Vec<u8>) -> Self {
        let txid = double_sha256(&raw);
        CoinbaseTx { raw, txid }
    }

    /// Wrap a coinbase whose txid is known, e.g. a witness serialization
    /// whose txid excludes the witness data.
    pub fn with_txid(raw: Vec<u8>, txid: [u8; 32]) -> Self {
        CoinbaseTx { raw, txid }
    }

    /// Decode a legacy-serialized coinbase from hex.
    pub fn from_hex(s: &str) -> Result<Self> {
        hex_to_bytes(s).map(Self::from_raw)
    }
}

/// Encode a variable-length integer (Bitcoin varint).
pub fn encode_varint(value: u64, output: &mut Vec<u8>) {
    if value < 0xfd {
        output.push(value as u8);
    } else if value <= 0xffff {
        output.push(0xfd);
        output.extend_from_slice(&(value as u16).to_le_bytes());
    } else if value <= 0xffffffff {
        output.push(0xfe);
        output.extend_from_slice(&(value as u32).to_le_bytes());
    } else {
        output.push(0xff);
        output.extend_from_slice(&value.to_le_bytes());
    }
}

/// Serialize a full block: header, transaction count, coinbase, then the
/// template transactions in order.
pub fn assemble<T: AsRef<[u8]>>(header: &BlockHeader, coinbase: &[u8], transactions: &[T]) -> Vec<u8> {
    let body: usize = transactions.iter().map(|tx| tx.as_ref().len()).sum();
    let mut block = Vec::with_capacity(BLOCK_HEADER_SIZE + 9 + coinbase.len() + body);

    // Block header (80 bytes)
    block.extend_from_slice(&header.serialize());

    // Transaction count (varint), coinbase included
    encode_varint(1 + transactions.len() as u64, &mut block);

    block.extend_from_slice(coinbase);
    for tx in transactions {
        block.extend_from_slice(tx.as_ref());
    }

    block
}

/// [`assemble`], hex-encoded for `submitblock`.
pub fn assemble_hex<T: AsRef<[u8]>>(header: &BlockHeader, coinbase: &[u8], transactions: &[T]) -> String {
    hex::encode(assemble(header, coinbase, transactions))
}

/// Everything needed to mine and submit one block.
#[derive(Debug, Clone)]
pub struct CandidateBlock {
    /// The block header.
    pub header: BlockHeader,
    /// The block target (256-bit).
    pub target: Target,
    /// The coinbase transaction.
    pub coinbase: CoinbaseTx,
    /// Raw template transactions, in block order.
    pub transactions: Vec<Vec<u8>>,
    /// The block height.
    pub height: u32,
}

impl CandidateBlock {
    /// Build a candidate from a template and an externally built coinbase.
    ///
    /// Decodes every transaction, computes the merkle root, and derives the
    /// target up front, so a bad template fails here and never mid-search.
    pub fn new(template: &BlockTemplate, coinbase: CoinbaseTx) -> Result<Self> {
        let transactions = template
            .transactions
            .iter()
            .map(|tx| tx.raw_bytes())
            .collect::<Result<Vec<_>>>()?;

        let leaves = leaves_from_template(coinbase.txid, template)?;
        let merkle_root = compute_merkle_root(&leaves)?;
        let header = parse_header(template, merkle_root)?;
        let target = header.target()?;

        debug!(height = template.height, target = %target, "built candidate block");

        Ok(CandidateBlock {
            header,
            target,
            coinbase,
            transactions,
            height: template.height,
        })
    }

    /// Record the winning nonce in the header.
    ///
    /// The nonce is checked against the target first; a nonce that fails
    /// leaves the header untouched. Returns the block hash, big-endian.
    pub fn solve(&mut self, nonce: u32) -> Result<[u8; 32]> {
        let hash = verify_solution(&self.header, &self.target, nonce)
            .ok_or(MinerError::InvalidSolution(nonce))?;
        self.header.set_nonce(nonce);
        info!(height = self.height, nonce, hash = %hex::encode(hash), "block solved");
        Ok(hash)
    }

    /// True if the header, with its current nonce, meets the target.
    pub fn is_solved(&self) -> bool {
        crate::pow::header_meets_target(&self.header, &self.target)
    }

    /// Serialize the complete block for submission.
    pub fn serialize_block(&self) -> Vec<u8> {
        assemble(&self.header, &self.coinbase.raw, &self.transactions)
    }

    /// Get the block as hex string for submission.
    pub fn serialize_block_hex(&self) -> String {
        hex::encode(self.serialize_block())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use crate::encoding::display_hex_to_hash;

    fn template(transactions: serde_json::Value) -> BlockTemplate {
        BlockTemplate::from_json(&json!({
            "version": 1,
            "previousblockhash": "0000000000000000000000000000000000000000000000000000000000000000",
            "bits": "1d00ffff",
            "curtime": 1231006505u32,
            "height": 0,
            "coinbasevalue": 5_000_000_000u64,
            "transactions": transactions
        }))
        .unwrap()
    }

    #[test]
    fn test_encode_varint() {
        let cases: [(u64, &[u8]); 6] = [
            (100, &[100]),
            (0xfc, &[0xfc]),
            (0xfd, &[0xfd, 0xfd, 0x00]),
            (0x1234, &[0xfd, 0x34, 0x12]),
            (0x10000, &[0xfe, 0x00, 0x00, 0x01, 0x00]),
            (0x1_0000_0000, &[0xff, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00]),
        ];

        for (value, expected) in cases {
            let mut output = Vec::new();
            encode_varint(value, &mut output);
            assert_eq!(output, expected, "varint {:#x}", value);
        }
    }

    #[test]
    fn test_assemble_layout() {
        let header = BlockHeader::new(2, [1u8; 32], [2u8; 32], 3, 0x1d00ffff);
        let coinbase = [0xC0u8; 10];
        let txs = [vec![0xA1u8; 5], vec![0xA2u8; 7]];

        let block = assemble(&header, &coinbase, &txs);

        assert_eq!(&block[..80], &header.serialize()[..]);
        assert_eq!(block[80], 3); // varint(1 + 2)
        assert_eq!(&block[81..91], &coinbase[..]);
        assert_eq!(&block[91..96], &txs[0][..]);
        assert_eq!(&block[96..], &txs[1][..]);
    }

    #[test]
    fn test_assemble_large_count_uses_wide_varint() {
        let header = BlockHeader::new(2, [0u8; 32], [0u8; 32], 0, 0x1d00ffff);
        let txs: Vec<Vec<u8>> = (0..300).map(|_| vec![0u8]).collect();
        let block = assemble(&header, &[], &txs);
        assert_eq!(&block[80..83], &[0xfd, 0x2d, 0x01]); // 301
    }

    #[test]
    fn test_genesis_candidate() {
        // The genesis coinbase: its txid is the genesis merkle root.
        let coinbase = CoinbaseTx::from_hex(concat!(
            "01000000010000000000000000000000000000000000000000000000000000000000000000ffffffff",
            "4d04ffff001d0104455468652054696d65732030332f4a616e2f32303039204368616e63656c6c6f72",
            "206f6e206272696e6b206f66207365636f6e64206261696c6f757420666f722062616e6b73ffffffff",
            "0100f2052a01000000434104678afdb0fe5548271967f1a67130b7105cd6a828e03909a67962e0ea1f",
            "61deb649f6bc3f4cef38c4f35504e51ec112de5c384df7ba0b8d578a4c702b6bf11d5fac00000000"
        ))
        .unwrap();
        assert_eq!(
            coinbase.txid,
            display_hex_to_hash("4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b").unwrap()
        );

        let mut candidate = CandidateBlock::new(&template(json!([])), coinbase.clone()).unwrap();
        assert_eq!(candidate.header.merkle_root, coinbase.txid);
        assert!(!candidate.is_solved());

        let hash = candidate.solve(2083236893).unwrap();
        assert!(candidate.is_solved());
        assert_eq!(hex::encode(hash), candidate.header.display_hash_hex());

        let block = candidate.serialize_block();
        assert_eq!(block.len(), 80 + 1 + coinbase.raw.len());
        assert_eq!(block[80], 1);
        assert_eq!(
            candidate.header.display_hash_hex(),
            "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f"
        );
    }

    #[test]
    fn test_solve_rejects_nonce_that_misses_target() {
        let mut candidate = CandidateBlock::new(&template(json!([])), CoinbaseTx::from_raw(vec![0x01])).unwrap();
        let before = candidate.header;

        assert_eq!(candidate.solve(42), Err(MinerError::InvalidSolution(42)));
        assert_eq!(candidate.header, before);
        assert_eq!(candidate.header.nonce, 0);
    }

    #[test]
    fn test_candidate_with_template_transactions() {
        let txs = json!([
            { "data": "aabb", "txid": "1111111111111111111111111111111111111111111111111111111111111111", "fee": 1 },
            { "data": "ccddee", "txid": "2222222222222222222222222222222222222222222222222222222222222222", "fee": 2 }
        ]);
        let coinbase = CoinbaseTx::with_txid(vec![0x01, 0x02], [0x33; 32]);
        let candidate = CandidateBlock::new(&template(txs), coinbase).unwrap();

        let expected_root = compute_merkle_root(&[[0x33; 32], [0x11; 32], [0x22; 32]]).unwrap();
        assert_eq!(candidate.header.merkle_root, expected_root);

        let block = candidate.serialize_block();
        assert_eq!(block[80], 3);
        assert_eq!(&block[81..], &[0x01, 0x02, 0xaa, 0xbb, 0xcc, 0xdd, 0xee]);
        assert!(candidate.serialize_block_hex().ends_with("0102aabbccddee"));
    }

    #[test]
    fn test_candidate_rejects_bad_transaction_hex() {
        let txs = json!([
            { "data": "abc", "txid": "1111111111111111111111111111111111111111111111111111111111111111" }
        ]);
        let result = CandidateBlock::new(&template(txs), CoinbaseTx::from_raw(vec![0]));
        assert!(matches!(result, Err(MinerError::InvalidEncoding(_))));
    }
}
