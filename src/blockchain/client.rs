//! High-level Hive client.
//!
//! # Responsibilities
//! - Own the RPC client, chain id, key ring and acting account
//! - Validate inputs for each operation before any network call
//! - Hand finished operation lists to the [`Broadcaster`]

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::blockchain::operations::{self, Amount, CommunityProps, Operation};
use crate::blockchain::tapos;
use crate::blockchain::transaction::{Broadcaster, Transaction};
use crate::blockchain::types::{
    BroadcastOptions, BroadcastReceipt, ChainId, DynamicGlobalProperties, RefBlock,
};
use crate::blockchain::wallet::KeyRing;
use crate::config::loader::ConfigError;
use crate::config::validation::validate_config;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::rpc::{HttpTransport, RpcClient, Strictness, Transport};

/// `app` field written into post metadata.
const APP: &str = concat!("hive-broadcaster/", env!("CARGO_PKG_VERSION"));

fn single_line(text: &str) -> String {
    text.chars().filter(|c| *c != '\r' && *c != '\n').collect()
}

#[derive(Debug, Deserialize)]
struct VersionInfo {
    chain_id: String,
}

#[derive(Debug)]
pub struct HiveClient {
    rpc: RpcClient,
    chain_id: ChainId,
    keys: KeyRing,
    account: Option<String>,
    defaults: BroadcastOptions,
}

impl HiveClient {
    /// Connect over HTTP using the configured node list.
    pub async fn connect(config: &ClientConfig, keys: KeyRing) -> ClientResult<Self> {
        validate_config(config).map_err(ConfigError::Validation)?;
        let transport = HttpTransport::from_config(config)?;
        Self::with_transport(config, keys, Arc::new(transport)).await
    }

    /// Build on any transport. Fetches the chain id when the config has none.
    pub async fn with_transport(
        config: &ClientConfig,
        keys: KeyRing,
        transport: Arc<dyn Transport>,
    ) -> ClientResult<Self> {
        validate_config(config).map_err(ConfigError::Validation)?;
        if let Some(account) = &config.account {
            operations::validate_account_name(account)?;
        }

        let rpc = RpcClient::new(transport);
        let chain_id = match &config.chain_id {
            Some(text) => text.parse::<ChainId>()?,
            None => {
                let version: VersionInfo = rpc.call_as("database_api", "get_version", None).await?;
                version.chain_id.parse::<ChainId>()?
            }
        };

        info!(
            chain_id = %chain_id,
            account = config.account.as_deref().unwrap_or("-"),
            nodes = config.nodes.len(),
            "Hive client ready"
        );

        Ok(Self {
            rpc,
            chain_id,
            keys,
            account: config.account.clone(),
            defaults: BroadcastOptions::from(&config.broadcast),
        })
    }

    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }

    pub fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    pub fn keys(&self) -> &KeyRing {
        &self.keys
    }

    /// Broadcast options from configuration.
    pub fn broadcast_options(&self) -> BroadcastOptions {
        self.defaults
    }

    /// The acting account, required by every high-level operation.
    pub fn account(&self) -> ClientResult<&str> {
        self.account
            .as_deref()
            .ok_or_else(|| ClientError::Configuration("no account configured".into()))
    }

    pub async fn get_dynamic_global_properties(&self) -> ClientResult<DynamicGlobalProperties> {
        self.rpc
            .call_as("database_api", "get_dynamic_global_properties", None)
            .await
    }

    pub async fn reference_block(&self) -> ClientResult<RefBlock> {
        tapos::resolve(&self.rpc).await
    }

    /// Run arbitrary allow-listed operations through the full pipeline.
    pub async fn broadcast(
        &self,
        operations: Vec<Operation>,
        options: &BroadcastOptions,
    ) -> ClientResult<BroadcastReceipt> {
        Broadcaster::new(&self.rpc, self.chain_id, &self.keys)
            .broadcast(operations, options)
            .await
    }

    /// Weight in [-10000, 10000]; negative is a downvote.
    pub async fn vote(
        &self,
        author: &str,
        permlink: &str,
        weight: i16,
        options: &BroadcastOptions,
    ) -> ClientResult<BroadcastReceipt> {
        let op = operations::vote(self.account()?, author, permlink, weight)?;
        self.broadcast(vec![op], options).await
    }

    pub async fn transfer(
        &self,
        to: &str,
        amount: &Amount,
        memo: &str,
        options: &BroadcastOptions,
    ) -> ClientResult<BroadcastReceipt> {
        let op = operations::transfer(self.account()?, to, amount, memo)?;
        self.broadcast(vec![op], options).await
    }

    pub async fn transfer_to_savings(
        &self,
        to: &str,
        amount: &Amount,
        memo: &str,
        options: &BroadcastOptions,
    ) -> ClientResult<BroadcastReceipt> {
        let op = operations::transfer_to_savings(self.account()?, to, amount, memo)?;
        self.broadcast(vec![op], options).await
    }

    /// Power up HIVE into `to`'s vesting balance.
    pub async fn transfer_to_vesting(
        &self,
        to: &str,
        amount: &Amount,
        options: &BroadcastOptions,
    ) -> ClientResult<BroadcastReceipt> {
        let op = operations::transfer_to_vesting(self.account()?, to, amount)?;
        self.broadcast(vec![op], options).await
    }

    /// With no `required_auths` the acting account signs with posting authority.
    pub async fn custom_json(
        &self,
        id: &str,
        data: &Value,
        required_auths: &[String],
        options: &BroadcastOptions,
    ) -> ClientResult<BroadcastReceipt> {
        let account = self.account()?.to_string();
        let posting: Vec<String> = if required_auths.is_empty() {
            vec![account]
        } else {
            Vec::new()
        };
        let op = operations::custom_json(id, data, required_auths, &posting)?;
        self.broadcast(vec![op], options).await
    }

    pub async fn reblog(
        &self,
        author: &str,
        permlink: &str,
        options: &BroadcastOptions,
    ) -> ClientResult<BroadcastReceipt> {
        let op = operations::reblog(self.account()?, author, permlink)?;
        self.broadcast(vec![op], options).await
    }

    pub async fn subscribe(&self, community: &str, options: &BroadcastOptions) -> ClientResult<BroadcastReceipt> {
        let op = operations::community_subscription(self.account()?, community, true)?;
        self.broadcast(vec![op], options).await
    }

    pub async fn unsubscribe(&self, community: &str, options: &BroadcastOptions) -> ClientResult<BroadcastReceipt> {
        let op = operations::community_subscription(self.account()?, community, false)?;
        self.broadcast(vec![op], options).await
    }

    /// Publish a root post. The permlink comes from the title; the post goes
    /// to `community` when given, otherwise under its first tag.
    pub async fn new_post(
        &self,
        title: &str,
        body: &str,
        description: &str,
        tags: &[String],
        community: Option<&str>,
        options: &BroadcastOptions,
    ) -> ClientResult<BroadcastReceipt> {
        let author = self.account()?;
        let title = single_line(title);
        let permlink = operations::permlink_from_title(&title)?;
        let tags = operations::normalize_tags(tags);

        let parent_permlink = match community {
            Some(community) => {
                operations::validate_community(community)?;
                community.to_string()
            }
            None => tags.first().cloned().ok_or_else(|| {
                ClientError::Validation("a post needs a community or at least one tag".into())
            })?,
        };

        let metadata = json!({
            "description": single_line(description),
            "tags": tags,
            "format": "markdown",
            "app": APP,
            "image": operations::markdown_images(body),
        });
        let op = operations::comment("", &parent_permlink, author, &permlink, &title, body, &metadata)?;
        self.broadcast(vec![op], options).await
    }

    /// Reply to `author/permlink`. With `edit` the reply permlink is fixed, so
    /// replying again edits the same comment; otherwise a timestamp makes it new.
    pub async fn reply(
        &self,
        author: &str,
        permlink: &str,
        body: &str,
        edit: bool,
        options: &BroadcastOptions,
    ) -> ClientResult<BroadcastReceipt> {
        let account = self.account()?;
        operations::validate_permlink(permlink)?;
        let suffix = if edit {
            String::new()
        } else {
            Utc::now().format("-%Y%m%d%H%M%S").to_string()
        };
        let reply_permlink = operations::reply_permlink(permlink, &suffix);

        let metadata = json!({
            "description": "",
            "format": "markdown",
            "app": APP,
            "image": operations::markdown_images(body),
        });
        let op = operations::comment(author, permlink, account, &reply_permlink, "", body, &metadata)?;
        self.broadcast(vec![op], options).await
    }

    pub async fn mute(
        &self,
        community: &str,
        author: &str,
        permlink: &str,
        notes: &str,
        options: &BroadcastOptions,
    ) -> ClientResult<BroadcastReceipt> {
        let op = operations::mute_post(self.account()?, community, author, permlink, notes, true)?;
        self.broadcast(vec![op], options).await
    }

    pub async fn unmute(
        &self,
        community: &str,
        author: &str,
        permlink: &str,
        notes: &str,
        options: &BroadcastOptions,
    ) -> ClientResult<BroadcastReceipt> {
        let op = operations::mute_post(self.account()?, community, author, permlink, notes, false)?;
        self.broadcast(vec![op], options).await
    }

    /// Mute with the conventional `spam` note.
    pub async fn mark_spam(
        &self,
        community: &str,
        author: &str,
        permlink: &str,
        options: &BroadcastOptions,
    ) -> ClientResult<BroadcastReceipt> {
        self.mute(community, author, permlink, "spam", options).await
    }

    pub async fn pin(
        &self,
        community: &str,
        author: &str,
        permlink: &str,
        options: &BroadcastOptions,
    ) -> ClientResult<BroadcastReceipt> {
        let op = operations::pin_post(self.account()?, community, author, permlink, true)?;
        self.broadcast(vec![op], options).await
    }

    pub async fn unpin(
        &self,
        community: &str,
        author: &str,
        permlink: &str,
        options: &BroadcastOptions,
    ) -> ClientResult<BroadcastReceipt> {
        let op = operations::pin_post(self.account()?, community, author, permlink, false)?;
        self.broadcast(vec![op], options).await
    }

    pub async fn flag(
        &self,
        community: &str,
        author: &str,
        permlink: &str,
        notes: &str,
        options: &BroadcastOptions,
    ) -> ClientResult<BroadcastReceipt> {
        let op = operations::flag_post(self.account()?, community, author, permlink, notes)?;
        self.broadcast(vec![op], options).await
    }

    pub async fn update_community(
        &self,
        community: &str,
        props: &CommunityProps,
        options: &BroadcastOptions,
    ) -> ClientResult<BroadcastReceipt> {
        let op = operations::update_community(self.account()?, community, props)?;
        self.broadcast(vec![op], options).await
    }

    /// Lenient: `None` means the node could not say, not that authority is missing.
    pub async fn verify_authority(&self, transaction: &Transaction) -> ClientResult<Option<bool>> {
        self.rpc
            .verify_authority(transaction, Strictness::Lenient)
            .await
    }
}
