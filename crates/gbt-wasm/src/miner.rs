//! Mining controller for the WASM miner.

use gbt_core::difficulty::format_difficulty;
use gbt_core::encoding::hash_to_display_hex;
use gbt_core::kernel::{CpuKernel, SearchKernel, SearchResult, DEFAULT_BATCH_SIZE};
use gbt_core::network::SHARE_MIN_LEADING_ZEROS;
use gbt_core::{BlockTemplate, CandidateBlock, CoinbaseTx, MinerError, Network};
use thiserror::Error;
use wasm_bindgen::prelude::*;
use crate::state::{MiningResultInfo, MiningStats, TemplateInfo};

/// Errors from driving a mining session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("No template loaded")]
    NoTemplate,

    #[error("Nonce space exhausted for round {0}; load a fresh template")]
    NonceSpaceExhausted(u32),

    #[error(transparent)]
    Pipeline(#[from] MinerError),
}

/// One miner's rounds, independent of the JS host.
///
/// Each template starts a new round. Results are only applied to the
/// round they were mined for, so a batch that finishes after a template
/// switch is dropped.
pub struct MiningSession<K: SearchKernel> {
    kernel: K,
    candidate: Option<CandidateBlock>,
    round: u32,
    next_nonce: Option<u32>,
    stats: MiningStats,
}

impl<K: SearchKernel> MiningSession<K> {
    /// Create an idle session around `kernel`.
    pub fn new(kernel: K) -> Self {
        MiningSession {
            kernel,
            candidate: None,
            round: 0,
            next_nonce: None,
            stats: MiningStats::new(),
        }
    }

    /// Replace the current job with a new template and coinbase.
    pub fn load_template(
        &mut self,
        template: &BlockTemplate,
        coinbase: CoinbaseTx,
        start_nonce: u32,
    ) -> Result<TemplateInfo, SessionError> {
        let candidate = CandidateBlock::new(template, coinbase)?;
        let difficulty = candidate.target.difficulty();

        self.round += 1;
        let info = TemplateInfo {
            round: self.round,
            height: template.height,
            prev_hash: template.previous_block_hash.clone(),
            bits: candidate.header.bits,
            target: candidate.target.to_hex(),
            difficulty,
            difficulty_display: format_difficulty(difficulty),
            reward: template.coinbase_value,
            reward_btc: template.coinbase_value as f64 / 100_000_000.0,
            transactions: template.transactions.len(),
            merkle_root: hash_to_display_hex(&candidate.header.merkle_root),
        };

        self.candidate = Some(candidate);
        self.next_nonce = Some(start_nonce);
        self.stats.block_found = false;
        self.stats.current_nonce = start_nonce;
        self.stats.rounds = self.round;

        Ok(info)
    }

    /// Run one kernel batch against the current round.
    pub fn mine_batch(&mut self) -> Result<MiningResultInfo, SessionError> {
        let candidate = self.candidate.as_mut().ok_or(SessionError::NoTemplate)?;
        if self.stats.block_found {
            return Err(SessionError::NonceSpaceExhausted(self.round));
        }
        let start = self
            .next_nonce
            .ok_or(SessionError::NonceSpaceExhausted(self.round))?;

        let result = self.kernel.search(&candidate.header, &candidate.target, start);
        self.next_nonce = result.next_nonce(start);

        let claim = result.found.then(|| candidate.solve(result.nonce));
        let solved = matches!(claim, Some(Ok(_)));

        // a refused claim still spent its hashes
        self.stats.record_batch(&SearchResult { found: solved, ..result }, SHARE_MIN_LEADING_ZEROS);
        self.stats.current_nonce = self.next_nonce.unwrap_or(u32::MAX);

        if let Some(Err(e)) = claim {
            return Err(e.into());
        }

        Ok(MiningResultInfo::from_search(
            self.round,
            &result,
            SHARE_MIN_LEADING_ZEROS,
            self.next_nonce.is_none() && !result.found,
        ))
    }

    /// Serialized block, once solved.
    pub fn block_hex(&self) -> Option<String> {
        match &self.candidate {
            Some(candidate) if self.stats.block_found => Some(candidate.serialize_block_hex()),
            _ => None,
        }
    }

    /// Current round; 0 before the first template.
    pub fn round(&self) -> u32 {
        self.round
    }

    /// Statistics across all rounds.
    pub fn stats(&self) -> &MiningStats {
        &self.stats
    }

    /// Mutable statistics, for host-side timing.
    pub fn stats_mut(&mut self) -> &mut MiningStats {
        &mut self.stats
    }

    /// Drop the current job and statistics.
    pub fn reset(&mut self) {
        self.candidate = None;
        self.next_nonce = None;
        self.stats = MiningStats::new();
    }
}

/// The main mining controller.
#[wasm_bindgen]
pub struct Miner {
    /// The network being mined.
    network: Network,
    /// Rounds, kernel, and statistics.
    session: MiningSession<CpuKernel>,
    /// Start time of mining.
    start_time: f64,
    /// Whether mining is active.
    is_mining: bool,
}

#[wasm_bindgen]
impl Miner {
    /// Create a new miner instance.
    ///
    /// # Arguments
    /// * `network` - The network ("mainnet", "testnet4" or "regtest")
    /// * `batch_size` - Nonces per `mine_batch` call (0 for the default)
    #[wasm_bindgen(constructor)]
    pub fn new(network: &str, batch_size: u32) -> Result<Miner, JsValue> {
        let net: Network = network
            .parse()
            .map_err(|_| JsValue::from_str("Invalid network"))?;

        let batch_size = if batch_size == 0 { DEFAULT_BATCH_SIZE } else { batch_size };

        Ok(Miner {
            network: net,
            session: MiningSession::new(CpuKernel::new(batch_size)),
            start_time: 0.0,
            is_mining: false,
        })
    }

    /// Load a block template for a new round.
    ///
    /// # Arguments
    /// * `template_json` - The `result` object of `getblocktemplate`, as JSON text
    /// * `coinbase_hex` - Serialized coinbase transaction for this template
    #[wasm_bindgen]
    pub fn load_template(&mut self, template_json: &str, coinbase_hex: &str) -> Result<JsValue, JsValue> {
        let template = BlockTemplate::from_json_str(template_json).map_err(to_js_error)?;
        let coinbase = CoinbaseTx::from_hex(coinbase_hex).map_err(to_js_error)?;

        let info = self
            .session
            .load_template(&template, coinbase, random_start_nonce())
            .map_err(to_js_error)?;

        console_log(&format!(
            "Round {}: height {} on {}, difficulty {}",
            info.round, info.height, self.network, info.difficulty_display
        ));

        info.to_js()
    }

    /// Mine a batch of nonces.
    ///
    /// # Returns
    /// Mining result with share/block found status and statistics.
    #[wasm_bindgen]
    pub fn mine_batch(&mut self) -> Result<JsValue, JsValue> {
        let info = self.session.mine_batch().map_err(to_js_error)?;

        // Update elapsed time
        if self.start_time > 0.0 {
            let stats = self.session.stats_mut();
            stats.elapsed_ms = js_sys::Date::now() - self.start_time;
            stats.update_hash_rate();
        }

        if info.block_found {
            console_log(&format!(
                "Block found! nonce {} hash {}",
                info.nonce.unwrap_or_default(),
                info.hash.as_deref().unwrap_or_default()
            ));
        }

        info.to_js()
    }

    /// Start mining.
    #[wasm_bindgen]
    pub fn start_mining(&mut self) {
        self.is_mining = true;
        self.start_time = js_sys::Date::now();
    }

    /// Stop mining.
    #[wasm_bindgen]
    pub fn stop_mining(&mut self) {
        self.is_mining = false;
    }

    /// Check if mining is active.
    #[wasm_bindgen(getter)]
    pub fn is_mining(&self) -> bool {
        self.is_mining
    }

    /// The current round number.
    #[wasm_bindgen(getter)]
    /// Current round; 0 before the first template.
    pub fn round(&self) -> u32 {
        self.session.round()
    }

    /// Get current mining statistics.
    #[wasm_bindgen]
    pub fn get_stats(&self) -> Result<JsValue, JsValue> {
        self.session.stats().to_js()
    }

    /// Get the formatted hash rate.
    #[wasm_bindgen]
    pub fn get_hash_rate_display(&self) -> String {
        self.session.stats().format_hash_rate()
    }

    /// Get the serialized block for submission (if a valid block was found).
    #[wasm_bindgen]
    pub fn get_block_hex(&self) -> Option<String> {
        self.session.block_hex()
    }

    /// Reset the miner for a new block.
    #[wasm_bindgen]
    pub fn reset(&mut self) {
        self.session.reset();
        self.start_time = 0.0;
        self.is_mining = false;
    }

    /// Get the current network.
    #[wasm_bindgen(getter)]
    pub fn network(&self) -> String {
        self.network.name().to_string()
    }
}

/// Random first nonce, so several tabs on one template don't overlap.
fn random_start_nonce() -> u32 {
    let mut buf = [0u8; 4];
    start_nonce_from(getrandom::getrandom(&mut buf).map(|()| buf)).unwrap_or_else(|message| {
        console_log(&message);
        0
    })
}

fn start_nonce_from(random: Result<[u8; 4], getrandom::Error>) -> Result<u32, String> {
    random
        .map(u32::from_le_bytes)
        .map_err(|e| format!("No randomness for the start nonce ({}), starting at 0", e))
}

pub(crate) fn to_js_error<E: std::fmt::Display>(e: E) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Log to the browser console.
#[wasm_bindgen]
pub fn console_log(message: &str) {
    web_sys::console::log_1(&JsValue::from_str(message));
}
