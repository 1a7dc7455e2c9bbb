//! Transaction model and the broadcast pipeline.
//!
//! # Stages
//! ```text
//! VALIDATE   tags + authority, no network
//! BUILD      TaPoS + expiration
//! SERIALIZE  condenser_api.get_transaction_hex
//! SIGN       one key, one signature, replaces any prior set
//! VERIFY     condenser_api.verify_authority (strict + verify only)
//! SUBMIT     broadcast_transaction[_synchronous]
//! ```
//! The first failing stage ends the run; nothing is retried here.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::blockchain::authority;
use crate::blockchain::operations::Operation;
use crate::blockchain::signature::{self, CompactSignature};
use crate::blockchain::tapos;
use crate::blockchain::types::{BroadcastOptions, BroadcastReceipt, ChainId, RefBlock};
use crate::blockchain::wallet::KeyRing;
use crate::config::validation::EXPIRATION_RANGE;
use crate::error::{ClientError, ClientResult};
use crate::observability::metrics;
use crate::rpc::{RpcClient, Strictness};

pub const EXPIRATION_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// A graphene transaction in its JSON wire shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub ref_block_num: u16,
    pub ref_block_prefix: u32,
    pub expiration: String,
    pub operations: Vec<Operation>,
    #[serde(default)]
    pub extensions: Vec<Value>,
    #[serde(default)]
    pub signatures: Vec<CompactSignature>,
}

impl Transaction {
    pub fn new(reference: RefBlock, expiration: String, operations: Vec<Operation>) -> Self {
        Self {
            ref_block_num: reference.ref_block_num,
            ref_block_prefix: reference.ref_block_prefix,
            expiration,
            operations,
            extensions: Vec::new(),
            signatures: Vec::new(),
        }
    }

    /// Replace the signature set, dropping duplicates and keeping order.
    pub fn set_signatures(&mut self, signatures: Vec<CompactSignature>) {
        let mut unique: Vec<CompactSignature> = Vec::with_capacity(signatures.len());
        for sig in signatures {
            if !unique.contains(&sig) {
                unique.push(sig);
            }
        }
        self.signatures = unique;
    }
}

pub fn check_expiration_secs(secs: u32) -> ClientResult<()> {
    if EXPIRATION_RANGE.contains(&secs) {
        Ok(())
    } else {
        Err(ClientError::Validation(format!(
            "expiration must be {}..={} seconds, got {}",
            EXPIRATION_RANGE.start(),
            EXPIRATION_RANGE.end(),
            secs
        )))
    }
}

/// `now + secs` as `YYYY-MM-DDTHH:MM:SS` (UTC, no zone suffix).
pub fn expiration(now: DateTime<Utc>, secs: u32) -> ClientResult<String> {
    check_expiration_secs(secs)?;
    let at = now + ChronoDuration::seconds(i64::from(secs));
    Ok(at.format(EXPIRATION_FORMAT).to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastStage {
    Validate,
    Build,
    Serialize,
    Sign,
    Verify,
    Submit,
}

impl BroadcastStage {
    pub fn as_str(self) -> &'static str {
        match self {
            BroadcastStage::Validate => "validate",
            BroadcastStage::Build => "build",
            BroadcastStage::Serialize => "serialize",
            BroadcastStage::Sign => "sign",
            BroadcastStage::Verify => "verify",
            BroadcastStage::Submit => "submit",
        }
    }
}

/// Runs one transaction through the stages.
///
/// Borrowed per call from a long-lived client; holds no state of its own.
pub struct Broadcaster<'a> {
    rpc: &'a RpcClient,
    chain_id: ChainId,
    keys: &'a KeyRing,
}

impl<'a> Broadcaster<'a> {
    pub fn new(rpc: &'a RpcClient, chain_id: ChainId, keys: &'a KeyRing) -> Self {
        Self { rpc, chain_id, keys }
    }

    pub async fn broadcast(
        &self,
        operations: Vec<Operation>,
        options: &BroadcastOptions,
    ) -> ClientResult<BroadcastReceipt> {
        match self.run(operations, options).await {
            Ok(receipt) => {
                metrics::record_broadcast("done", "success");
                info!(
                    transaction_id = %receipt.transaction_id,
                    synchronous = options.synchronous,
                    "Transaction broadcast"
                );
                Ok(receipt)
            }
            Err((stage, err)) => {
                metrics::record_broadcast(stage.as_str(), "error");
                warn!(stage = stage.as_str(), error = %err, "Broadcast failed");
                Err(err)
            }
        }
    }

    async fn run(
        &self,
        operations: Vec<Operation>,
        options: &BroadcastOptions,
    ) -> Result<BroadcastReceipt, (BroadcastStage, ClientError)> {
        use BroadcastStage as Stage;

        let at = |stage: BroadcastStage| move |err: ClientError| (stage, err);

        // VALIDATE
        if operations.is_empty() {
            return Err((Stage::Validate, ClientError::Validation("no operations".into())));
        }
        for op in &operations {
            op.validate().map_err(at(Stage::Validate))?;
        }
        check_expiration_secs(options.expiration_secs).map_err(at(Stage::Validate))?;
        let (role, key) = authority::resolve(&operations, self.keys).map_err(at(Stage::Validate))?;
        debug!(role = %role, operations = operations.len(), "Authority resolved");

        // BUILD
        let reference = tapos::resolve(self.rpc).await.map_err(at(Stage::Build))?;
        let expires = expiration(Utc::now(), options.expiration_secs).map_err(at(Stage::Build))?;
        let mut tx = Transaction::new(reference, expires, operations);

        // SERIALIZE
        let serialized = self
            .rpc
            .get_transaction_hex(&tx)
            .await
            .map_err(at(Stage::Serialize))?;
        let transaction_id = signature::transaction_id(&serialized).map_err(at(Stage::Serialize))?;
        debug!(transaction_id = %transaction_id, "Serialized transaction");

        // SIGN
        let signatures = signature::sign_transaction(&self.chain_id, &serialized, &[key])
            .map_err(at(Stage::Sign))?;
        tx.set_signatures(signatures);

        // VERIFY
        if options.strict && options.verify {
            let verdict = self
                .rpc
                .verify_authority(&tx, Strictness::Strict)
                .await
                .map_err(at(Stage::Verify))?;
            if verdict != Some(true) {
                return Err((
                    Stage::Verify,
                    ClientError::Authority(format!(
                        "node rejected {} signature for {}",
                        role, transaction_id
                    )),
                ));
            }
        }

        // SUBMIT
        let strictness = if options.strict {
            Strictness::Strict
        } else {
            Strictness::Lenient
        };
        let result = if options.synchronous {
            self.rpc.broadcast_transaction_synchronous(&tx, strictness).await
        } else {
            self.rpc.broadcast_transaction(&tx, strictness).await
        }
        .map_err(at(Stage::Submit))?;

        Ok(BroadcastReceipt {
            transaction_id,
            result,
        })
    }
}
