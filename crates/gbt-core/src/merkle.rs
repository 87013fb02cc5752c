//! Merkle tree computation for Bitcoin transactions.

use alloc::vec::Vec;
use tracing::debug;
use crate::encoding::{display_hex_to_hash, hash_to_display_hex};
use crate::error::{MinerError, Result};
use crate::hash::double_sha256;
use crate::template::BlockTemplate;

/// Compute the merkle root from a list of transaction IDs.
///
/// Leaves and the returned root are in internal (wire) byte order, so the
/// root can be placed straight into a header. A single leaf is returned
/// unchanged. Odd levels duplicate their last hash, exactly as nodes do,
/// which keeps the CVE-2012-2459 ambiguity for compatibility.
pub fn compute_merkle_root(txids: &[[u8; 32]]) -> Result<[u8; 32]> {
    if txids.is_empty() {
        return Err(MinerError::EmptyTransactionSet);
    }

    let mut current_level: Vec<[u8; 32]> = txids.to_vec();

    while current_level.len() > 1 {
        if current_level.len() % 2 != 0 {
            let last = current_level[current_level.len() - 1];
            current_level.push(last);
        }

        current_level = current_level
            .chunks_exact(2)
            .map(|pair| {
                let mut combined = [0u8; 64];
                combined[..32].copy_from_slice(&pair[0]);
                combined[32..].copy_from_slice(&pair[1]);
                double_sha256(&combined)
            })
            .collect();
    }

    let root = current_level[0];
    debug!(leaves = txids.len(), root = %hash_to_display_hex(&root), "computed merkle root");
    Ok(root)
}

/// Collect merkle leaves for a block: the coinbase txid first, then every
/// template transaction's txid converted from display to internal order.
pub fn leaves_from_template(coinbase_txid: [u8; 32], template: &BlockTemplate) -> Result<Vec<[u8; 32]>> {
    let mut leaves = Vec::with_capacity(template.transactions.len() + 1);
    leaves.push(coinbase_txid);
    for tx in &template.transactions {
        leaves.push(display_hex_to_hash(&tx.txid)?);
    }
    Ok(leaves)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash_pair(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
        let mut combined = [0u8; 64];
        combined[..32].copy_from_slice(left);
        combined[32..].copy_from_slice(right);
        double_sha256(&combined)
    }

    #[test]
    fn test_empty_set_is_an_error() {
        assert_eq!(compute_merkle_root(&[]), Err(MinerError::EmptyTransactionSet));
    }

    #[test]
    fn test_single_tx_merkle_root() {
        let txid = [0x42u8; 32];
        let root = compute_merkle_root(&[txid]).unwrap();
        assert_eq!(root, txid);
    }

    #[test]
    fn test_two_tx_merkle_root() {
        let tx1 = [0x11u8; 32];
        let tx2 = [0x22u8; 32];

        let root = compute_merkle_root(&[tx1, tx2]).unwrap();
        assert_eq!(root, hash_pair(&tx1, &tx2));
    }

    #[test]
    fn test_three_tx_merkle_root() {
        // With 3 transactions, the third is duplicated
        let tx1 = [0x11u8; 32];
        let tx2 = [0x22u8; 32];
        let tx3 = [0x33u8; 32];

        let root = compute_merkle_root(&[tx1, tx2, tx3]).unwrap();

        let expected = hash_pair(&hash_pair(&tx1, &tx2), &hash_pair(&tx3, &tx3));
        assert_eq!(root, expected);
    }

    #[test]
    fn test_five_tx_duplicates_on_every_odd_level() {
        let txs: Vec<[u8; 32]> = (1u8..=5).map(|i| [i; 32]).collect();
        let root = compute_merkle_root(&txs).unwrap();

        let h12 = hash_pair(&txs[0], &txs[1]);
        let h34 = hash_pair(&txs[2], &txs[3]);
        let h55 = hash_pair(&txs[4], &txs[4]);
        let h1234 = hash_pair(&h12, &h34);
        let h5555 = hash_pair(&h55, &h55);
        assert_eq!(root, hash_pair(&h1234, &h5555));
    }

    #[test]
    fn test_block_100000_merkle_root() {
        // Block 100000: four transactions, root known from the chain.
        let txids = [
            "8c14f0db3df150123e6f3dbbf30f8b955a8249b62ac1d1ff16284aefa3d06d87",
            "fff2525b8931402dd09222c50775608f75787bd2b87e56995a7bdd30f79702c4",
            "6359f0868171b1d194cbee1af2f16ea598ae8fad666d9b012c8ed2b79a236ec4",
            "e9a66845e05d5abc0ad04ec80f774a7e585c6e8db975962d069a522137b80c1d",
        ];
        let leaves: Vec<[u8; 32]> = txids
            .iter()
            .map(|t| display_hex_to_hash(t).unwrap())
            .collect();

        let root = compute_merkle_root(&leaves).unwrap();
        assert_eq!(
            hash_to_display_hex(&root),
            "f3e94742aca4b5ef85488dc37c06c3282295ffec960994b2c0d5ac2a25a95766"
        );
    }
}
