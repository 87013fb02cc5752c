//! WebAssembly bindings for the getblocktemplate miner.
//!
//! This crate provides JavaScript-accessible APIs for:
//! - Talking to a node over JSON-RPC (`getblocktemplate`, `submitblock`)
//! - Mining template rounds in batches
//! - Reporting statistics to the page

use wasm_bindgen::prelude::*;

pub mod api;
pub mod miner;
pub mod state;

// Re-export main types for JS access
pub use api::NodeClient;
pub use miner::Miner;

/// Initialize the WASM module with better panic messages.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Get the library version.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
