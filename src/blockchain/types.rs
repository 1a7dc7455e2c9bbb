//! Chain-specific value types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::BroadcastConfig;
use crate::error::{ClientError, ClientResult};

/// 32-byte chain identifier mixed into every signature digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainId([u8; 32]);

impl ChainId {
    /// Hive mainnet.
    pub const HIVE_MAINNET: ChainId = ChainId([
        0xbe, 0xea, 0xb0, 0xde, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
        0, 0, 0, 0, 0, 0, 0,
    ]);

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl FromStr for ChainId {
    type Err = ClientError;

    fn from_str(s: &str) -> ClientResult<Self> {
        let bytes = hex::decode(s.trim())
            .map_err(|e| ClientError::Configuration(format!("chain id is not hex: {}", e)))?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| {
            ClientError::Configuration(format!("chain id must be 32 bytes, got {}", b.len()))
        })?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChainId({})", self)
    }
}

/// The TaPoS pair embedded in a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefBlock {
    pub ref_block_num: u16,
    pub ref_block_prefix: u32,
}

/// Subset of `database_api.get_dynamic_global_properties` the client reads.
#[derive(Debug, Clone, Deserialize)]
pub struct DynamicGlobalProperties {
    pub head_block_number: u64,
    #[serde(default)]
    pub head_block_id: String,
    #[serde(default)]
    pub time: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockHeader {
    pub previous: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub witness: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct BlockHeaderEnvelope {
    pub header: BlockHeader,
}

/// What a successful broadcast returns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BroadcastReceipt {
    /// First 20 bytes of SHA256 over the serialized transaction, hex.
    pub transaction_id: String,
    /// Raw `broadcast_transaction*` result. `Null` for a lenient call that got no answer.
    pub result: Value,
}

/// Per-call broadcast switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastOptions {
    pub expiration_secs: u32,
    /// Wait for block inclusion.
    pub synchronous: bool,
    /// Propagate transport/RPC errors. Lenient only affects SUBMIT.
    pub strict: bool,
    /// Ask the node to check authority before submitting. Needs `strict`.
    pub verify: bool,
}

impl Default for BroadcastOptions {
    fn default() -> Self {
        Self::from(&BroadcastConfig::default())
    }
}

impl From<&BroadcastConfig> for BroadcastOptions {
    fn from(config: &BroadcastConfig) -> Self {
        Self {
            expiration_secs: config.expiration_secs,
            synchronous: config.synchronous,
            strict: config.strict,
            verify: config.verify,
        }
    }
}
