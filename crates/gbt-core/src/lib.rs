//! Block template to candidate header pipeline for Bitcoin mining.
//!
//! This crate provides pure Rust implementations of:
//! - `getblocktemplate` parsing into an 80-byte block header
//! - Merkle roots with Bitcoin's duplicate-last-leaf rule
//! - Compact "bits" to 256-bit target conversion
//! - SHA256 double-hashing and header midstates
//! - Proof-of-work checks and full block serialization for `submitblock`
//!
//! Hashes are stored in internal (wire) byte order. They are reversed only
//! when node hex is parsed and when a hash is shown or compared to a target.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod block;
pub mod difficulty;
pub mod encoding;
pub mod error;
pub mod hash;
pub mod header;
pub mod kernel;
pub mod merkle;
pub mod network;
pub mod pow;
pub mod rpc;
pub mod template;

pub use block::{assemble, CandidateBlock, CoinbaseTx};
pub use difficulty::{bits_to_target, target_to_bits, Target};
pub use encoding::{bytes_to_hex, hex_to_bytes};
pub use error::{MinerError, Result};
pub use hash::double_sha256;
pub use header::{parse_header, BlockHeader};
pub use kernel::{CpuKernel, SearchKernel, SearchResult};
pub use merkle::compute_merkle_root;
pub use network::Network;
pub use pow::is_below_or_equal_target;
pub use template::{BlockTemplate, TransactionTemplate};
