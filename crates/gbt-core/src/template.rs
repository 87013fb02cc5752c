//! `getblocktemplate` job descriptions.
//!
//! Fields are checked one by one against a `serde_json::Value` rather than
//! derived, so a bad template reports exactly which field is missing or
//! mistyped.

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use serde_json::{Map, Value};
use tracing::debug;
use crate::difficulty::Target;
use crate::encoding::{display_hex_to_hash, hex_to_bytes, hex_to_hash};
use crate::error::{MinerError, Result};

/// A transaction the node wants included in the block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionTemplate {
    /// Raw transaction bytes, hex-encoded.
    pub data: String,
    /// Transaction id, display (big-endian) hex.
    pub txid: String,
    /// Witness transaction id, display hex, when the node sends one.
    pub hash: Option<String>,
    /// Fee in satoshis. Informational only.
    pub fee: i64,
}

impl TransactionTemplate {
    /// Decode the raw transaction bytes.
    pub fn raw_bytes(&self) -> Result<Vec<u8>> {
        hex_to_bytes(&self.data)
    }

    /// The txid in internal byte order, ready to be a merkle leaf.
    pub fn txid_internal(&self) -> Result<[u8; 32]> {
        display_hex_to_hash(&self.txid)
    }
}

/// A block template for one mining round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockTemplate {
    /// Block version.
    pub version: i32,
    /// Previous block hash, display hex.
    pub previous_block_hash: String,
    /// Compact bits exactly as the node sent them.
    pub bits: String,
    /// `bits` parsed as a big-endian hex integer.
    pub bits_value: u32,
    /// Block time (`curtime`, or `time` on older nodes).
    pub curtime: u32,
    /// Height of the block being built.
    pub height: u32,
    /// Reward available to the coinbase (subsidy + fees), in satoshis.
    pub coinbase_value: u64,
    /// Payout address some pool front-ends embed in the template.
    pub coinbase_address: Option<String>,
    /// Expanded target hex, when present. Checked against `bits`.
    pub target: Option<String>,
    /// SegWit commitment script for the coinbase, hex.
    pub default_witness_commitment: Option<String>,
    /// Transactions in block order, excluding the coinbase.
    pub transactions: Vec<TransactionTemplate>,
}

impl BlockTemplate {
    /// Parse a template from JSON text (the `result` of `getblocktemplate`).
    pub fn from_json_str(s: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(s)?;
        Self::from_json(&value)
    }

    /// Parse a template from a JSON value.
    pub fn from_json(value: &Value) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| MinerError::InvalidFieldType("template".to_string()))?;

        let version = parse_version(require(obj, "version")?)?;

        let previous_block_hash = str_field(obj, "previousblockhash")?.to_string();
        hex_to_hash(&previous_block_hash)?;

        let bits = str_field(obj, "bits")?.to_string();
        let bits_value = parse_bits(&bits)?;

        let curtime = match obj.get("curtime") {
            Some(_) => u32_field(obj, "curtime")?,
            None => u32_field(obj, "time").map_err(|e| match e {
                MinerError::MissingField(_) => MinerError::MissingField("curtime".to_string()),
                other => other,
            })?,
        };

        let height = u32_field(obj, "height")?;
        let coinbase_value = u64_field(obj, "coinbasevalue")?;

        let coinbase_address = optional_str(obj, "coinbaseaddress")?;
        let target = optional_str(obj, "target")?;
        let default_witness_commitment = optional_str(obj, "default_witness_commitment")?;

        let transactions = require(obj, "transactions")?
            .as_array()
            .ok_or_else(|| MinerError::InvalidFieldType("transactions".to_string()))?
            .iter()
            .enumerate()
            .map(|(i, tx)| parse_transaction(i, tx))
            .collect::<Result<Vec<_>>>()?;

        let template = BlockTemplate {
            version,
            previous_block_hash,
            bits,
            bits_value,
            curtime,
            height,
            coinbase_value,
            coinbase_address,
            target,
            default_witness_commitment,
            transactions,
        };
        template.check_target()?;

        debug!(
            height = template.height,
            bits = %template.bits,
            transactions = template.transactions.len(),
            "parsed block template"
        );
        Ok(template)
    }

    /// Target derived from `bits`.
    pub fn target(&self) -> Result<Target> {
        Target::from_bits(self.bits_value)
    }

    /// Fail if an explicit `target` field disagrees with `bits`.
    fn check_target(&self) -> Result<()> {
        let derived = self.target()?;
        if let Some(explicit) = &self.target {
            if hex_to_hash(explicit)? != *derived.as_bytes() {
                return Err(MinerError::TargetMismatch {
                    bits: self.bits_value,
                    target: explicit.clone(),
                });
            }
        }
        Ok(())
    }

    /// Sum of the template transactions' fees.
    pub fn total_fees(&self) -> i64 {
        self.transactions.iter().map(|tx| tx.fee).sum()
    }
}

fn require<'a>(obj: &'a Map<String, Value>, name: &str) -> Result<&'a Value> {
    obj.get(name)
        .ok_or_else(|| MinerError::MissingField(name.to_string()))
}

fn str_field<'a>(obj: &'a Map<String, Value>, name: &str) -> Result<&'a str> {
    require(obj, name)?
        .as_str()
        .ok_or_else(|| MinerError::InvalidFieldType(name.to_string()))
}

fn optional_str(obj: &Map<String, Value>, name: &str) -> Result<Option<String>> {
    match obj.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(MinerError::InvalidFieldType(name.to_string())),
    }
}

fn u64_field(obj: &Map<String, Value>, name: &str) -> Result<u64> {
    require(obj, name)?
        .as_u64()
        .ok_or_else(|| MinerError::InvalidFieldType(name.to_string()))
}

fn u32_field(obj: &Map<String, Value>, name: &str) -> Result<u32> {
    u32::try_from(u64_field(obj, name)?)
        .map_err(|_| MinerError::InvalidFieldType(name.to_string()))
}

/// Versions are signed on the wire but nodes print them as plain integers;
/// accept anything that fits in 32 bits either way.
fn parse_version(value: &Value) -> Result<i32> {
    let invalid = || MinerError::InvalidFieldType("version".to_string());
    let v = value.as_i64().ok_or_else(invalid)?;
    if let Ok(signed) = i32::try_from(v) {
        return Ok(signed);
    }
    u32::try_from(v).map(|u| u as i32).map_err(|_| invalid())
}

/// `bits` is a hex string encoding a big-endian integer. It is not a hash
/// and is never byte-reversed.
fn parse_bits(bits: &str) -> Result<u32> {
    if bits.is_empty() || bits.len() > 8 || !bits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(MinerError::InvalidFieldType("bits".to_string()));
    }
    u32::from_str_radix(bits, 16).map_err(|_| MinerError::InvalidFieldType("bits".to_string()))
}

fn parse_transaction(index: usize, value: &Value) -> Result<TransactionTemplate> {
    let name = |field: &str| format!("transactions[{}].{}", index, field);

    let obj = value
        .as_object()
        .ok_or_else(|| MinerError::InvalidFieldType(format!("transactions[{}]", index)))?;

    let text = |field: &str| -> Result<String> {
        match obj.get(field) {
            None => Err(MinerError::MissingField(name(field))),
            Some(Value::String(s)) => Ok(s.clone()),
            Some(_) => Err(MinerError::InvalidFieldType(name(field))),
        }
    };

    let data = text("data")?;
    let txid = text("txid")?;
    display_hex_to_hash(&txid)?;

    let hash = match obj.get("hash") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => return Err(MinerError::InvalidFieldType(name("hash"))),
    };

    let fee = match obj.get("fee") {
        None => 0,
        Some(v) => v
            .as_i64()
            .ok_or_else(|| MinerError::InvalidFieldType(name("fee")))?,
    };

    Ok(TransactionTemplate { data, txid, hash, fee })
}
