//! Mining statistics and the records handed to the UI.

use gbt_core::hash::count_leading_zeros;
use gbt_core::kernel::SearchResult;
use serde::Serialize;
use wasm_bindgen::prelude::*;

/// Mining statistics.
///
/// Owned by the driver and updated only between kernel batches.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MiningStats {
    /// Total hashes computed.
    pub total_hashes: u64,
    /// Current hash rate (hashes per second).
    pub hash_rate: f64,
    /// Number of shares found.
    pub shares_found: u32,
    /// Whether a valid block was found.
    pub block_found: bool,
    /// Next nonce to try.
    pub current_nonce: u32,
    /// Elapsed time in milliseconds.
    pub elapsed_ms: f64,
    /// Best hash found (lowest), display hex.
    pub best_hash: Option<String>,
    /// Number of leading zeros in best hash.
    pub best_leading_zeros: u32,
    /// Templates mined since the miner was created.
    pub rounds: u32,
}

impl MiningStats {
    /// Create new empty stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one batch into the totals.
    pub fn record_batch(&mut self, result: &SearchResult, share_min_zeros: u32) {
        self.total_hashes += result.hashes_attempted;
        if result.found {
            self.block_found = true;
        }

        let Some(best) = result.best_hash else {
            return;
        };
        let leading_zeros = count_leading_zeros(&best);
        if self.best_hash.is_none() || leading_zeros > self.best_leading_zeros {
            self.best_hash = Some(hex::encode(best));
            self.best_leading_zeros = leading_zeros;
        }

        if leading_zeros >= share_min_zeros {
            self.shares_found += 1;
        }
    }

    /// Update hash rate based on elapsed time.
    pub fn update_hash_rate(&mut self) {
        if self.elapsed_ms > 0.0 {
            self.hash_rate = (self.total_hashes as f64) / (self.elapsed_ms / 1000.0);
        }
    }

    /// Format hash rate for display.
    pub fn format_hash_rate(&self) -> String {
        if self.hash_rate >= 1_000_000_000.0 {
            format!("{:.2} GH/s", self.hash_rate / 1_000_000_000.0)
        } else if self.hash_rate >= 1_000_000.0 {
            format!("{:.2} MH/s", self.hash_rate / 1_000_000.0)
        } else if self.hash_rate >= 1_000.0 {
            format!("{:.2} KH/s", self.hash_rate / 1_000.0)
        } else {
            format!("{:.2} H/s", self.hash_rate)
        }
    }

    /// Convert to JS value.
    pub fn to_js(&self) -> Result<JsValue, JsValue> {
        to_js(self)
    }
}

/// Block template information for display.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateInfo {
    /// Round this template belongs to.
    pub round: u32,
    /// Block height.
    pub height: u32,
    /// Previous block hash (display format).
    pub prev_hash: String,
    /// Difficulty bits.
    pub bits: u32,
    /// Expanded target, big-endian hex.
    pub target: String,
    /// Difficulty as a number.
    pub difficulty: f64,
    /// Formatted difficulty string.
    pub difficulty_display: String,
    /// Coinbase value in satoshis.
    pub reward: u64,
    /// Coinbase value in BTC.
    pub reward_btc: f64,
    /// Number of template transactions, excluding the coinbase.
    pub transactions: usize,
    /// Merkle root (display format).
    pub merkle_root: String,
}

impl TemplateInfo {
    /// Convert to JS value.
    pub fn to_js(&self) -> Result<JsValue, JsValue> {
        to_js(self)
    }
}

/// Result of a mining operation.
#[derive(Debug, Clone, Serialize)]
pub struct MiningResultInfo {
    /// Round the batch was mined against.
    pub round: u32,
    /// Whether the batch's best hash counts as a share.
    pub share_found: bool,
    /// Whether a valid block was found.
    pub block_found: bool,
    /// The winning nonce, if any.
    pub nonce: Option<u32>,
    /// The winning hash (display format), if any.
    pub hash: Option<String>,
    /// Lowest hash of the batch (display format).
    pub best_hash: Option<String>,
    /// Number of leading zeros in `best_hash`.
    pub leading_zeros: u32,
    /// Hashes computed in this batch.
    pub hashes_computed: u64,
    /// Whether the template's nonce space is used up.
    pub exhausted: bool,
}

impl MiningResultInfo {
    /// Describe a kernel batch.
    pub fn from_search(round: u32, result: &SearchResult, share_min_zeros: u32, exhausted: bool) -> Self {
        let leading_zeros = result.best_hash.as_ref().map_or(0, count_leading_zeros);
        MiningResultInfo {
            round,
            share_found: result.best_hash.is_some() && leading_zeros >= share_min_zeros,
            block_found: result.found,
            nonce: result.found.then_some(result.nonce),
            hash: result.found.then(|| hex::encode(result.hash)),
            best_hash: result.best_hash.map(hex::encode),
            leading_zeros,
            hashes_computed: result.hashes_attempted,
            exhausted,
        }
    }

    /// Convert to JS value.
    pub fn to_js(&self) -> Result<JsValue, JsValue> {
        to_js(self)
    }
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {:?}", e)))
}
