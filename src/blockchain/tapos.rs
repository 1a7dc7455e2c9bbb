//! TaPoS reference-block resolution.
//!
//! Resolved fresh for every broadcast; nothing here is cached.

use tracing::debug;

use crate::blockchain::types::{BlockHeaderEnvelope, DynamicGlobalProperties, RefBlock};
use crate::error::{ClientError, ClientResult};
use crate::rpc::RpcClient;

/// `(head - 3) & 0xFFFF`.
pub fn ref_block_num(head_block_number: u64) -> u16 {
    (head_block_number.wrapping_sub(3) & 0xFFFF) as u16
}

/// Little-endian u32 of bytes 4..8 of a block id.
pub fn ref_block_prefix(block_id_hex: &str) -> ClientResult<u32> {
    let bytes = hex::decode(block_id_hex.trim())
        .map_err(|e| ClientError::Serialization(format!("block id '{}': {}", block_id_hex, e)))?;
    let window: [u8; 4] = bytes
        .get(4..8)
        .and_then(|w| w.try_into().ok())
        .ok_or_else(|| {
            ClientError::Serialization(format!("block id '{}' is too short", block_id_hex))
        })?;
    Ok(u32::from_le_bytes(window))
}

/// Head number from global properties, then `previous` of block `head - 2`.
/// RPC failures propagate as-is.
pub async fn resolve(rpc: &RpcClient) -> ClientResult<RefBlock> {
    let props: DynamicGlobalProperties = rpc
        .call_as("database_api", "get_dynamic_global_properties", None)
        .await?;
    let head = props.head_block_number;
    if head < 3 {
        return Err(ClientError::Serialization(format!(
            "head block {} is too low for TaPoS",
            head
        )));
    }

    let envelope: BlockHeaderEnvelope = rpc
        .call_as(
            "block_api",
            "get_block_header",
            Some(serde_json::json!({ "block_num": head - 2 })),
        )
        .await?;

    let reference = RefBlock {
        ref_block_num: ref_block_num(head),
        ref_block_prefix: ref_block_prefix(&envelope.header.previous)?,
    };
    debug!(
        head_block_number = head,
        ref_block_num = reference.ref_block_num,
        ref_block_prefix = reference.ref_block_prefix,
        "Resolved TaPoS"
    );
    Ok(reference)
}
