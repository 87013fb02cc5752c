//! Bitcoin network definitions and constants.

use core::str::FromStr;
use alloc::string::String;

/// Bitcoin network type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Network {
    /// Bitcoin mainnet
    #[default]
    Mainnet,
    /// Bitcoin testnet4
    Testnet4,
    /// Local regression-test chain
    Regtest,
}

impl Network {
    /// Get the default RPC port for this network.
    pub fn default_rpc_port(&self) -> u16 {
        match self {
            Network::Mainnet => 8332,
            Network::Testnet4 => 48332,
            Network::Regtest => 18443,
        }
    }

    /// Default node URL on localhost.
    pub fn default_rpc_url(&self) -> String {
        alloc::format!("http://127.0.0.1:{}", self.default_rpc_port())
    }

    /// Compact bits of the easiest target the network allows.
    pub fn pow_limit_bits(&self) -> u32 {
        match self {
            Network::Mainnet | Network::Testnet4 => 0x1d00ffff,
            Network::Regtest => 0x207fffff,
        }
    }

    /// Get network name as string.
    pub fn name(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet4 => "testnet4",
            Network::Regtest => "regtest",
        }
    }

    /// Get display name for UI.
    pub fn display_name(&self) -> &'static str {
        match self {
            Network::Mainnet => "Bitcoin Mainnet",
            Network::Testnet4 => "Bitcoin Testnet4",
            Network::Regtest => "Bitcoin Regtest",
        }
    }
}

impl FromStr for Network {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mainnet" | "main" | "bitcoin" => Ok(Network::Mainnet),
            "testnet4" | "testnet" | "test" => Ok(Network::Testnet4),
            "regtest" => Ok(Network::Regtest),
            _ => Err(()),
        }
    }
}

impl core::fmt::Display for Network {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Size of a block header in bytes.
pub const BLOCK_HEADER_SIZE: usize = 80;

/// Minimum leading zero bits (display order) for a hash to count as a share.
/// 8 bits = 1 zero byte, roughly one share per 256 hashes.
pub const SHARE_MIN_LEADING_ZEROS: u32 = 8;
