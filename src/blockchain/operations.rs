//! Operations, assets and input validation.
//!
//! Every builder here validates its inputs locally; nothing touches the
//! network. The orchestrator re-checks tags, so hand-built operations go
//! through the same allow-list.

use std::fmt;
use std::str::FromStr;

use serde::de::Deserializer;
use serde::ser::{SerializeTuple, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{ClientError, ClientResult};

/// User-broadcastable operation tags. Virtual operations are excluded.
pub const OPERATION_TAGS: &[&str] = &[
    "vote",
    "comment",
    "transfer",
    "transfer_to_vesting",
    "withdraw_vesting",
    "limit_order_create",
    "limit_order_cancel",
    "feed_publish",
    "convert",
    "account_create",
    "account_update",
    "witness_update",
    "account_witness_vote",
    "account_witness_proxy",
    "pow",
    "custom",
    "report_over_production",
    "delete_comment",
    "custom_json",
    "comment_options",
    "set_withdraw_vesting_route",
    "limit_order_create2",
    "claim_account",
    "create_claimed_account",
    "request_account_recovery",
    "recover_account",
    "change_recovery_account",
    "escrow_transfer",
    "escrow_dispute",
    "escrow_release",
    "pow2",
    "escrow_approve",
    "transfer_to_savings",
    "transfer_from_savings",
    "cancel_transfer_from_savings",
    "custom_binary",
    "decline_voting_rights",
    "reset_account",
    "set_reset_account",
    "claim_reward_balance",
    "delegate_vesting_shares",
    "account_create_with_delegation",
    "witness_set_properties",
    "account_update2",
    "create_proposal",
    "update_proposal_votes",
    "remove_proposal",
];

pub const MAX_MEMO_BYTES: usize = 2048;
pub const MAX_PERMLINK_LEN: usize = 255;
pub const MAX_CUSTOM_ID_LEN: usize = 32;
pub const MAX_VOTE_WEIGHT: i16 = 10_000;
pub const MAX_TITLE_BYTES: usize = 256;
pub const MAX_COMMUNITY_TITLE_BYTES: usize = 20;
pub const MAX_COMMUNITY_ABOUT_BYTES: usize = 120;
pub const MAX_COMMUNITY_TEXT_BYTES: usize = 1000;

pub fn is_known_tag(tag: &str) -> bool {
    OPERATION_TAGS.contains(&tag)
}

/// A single chain operation. On the wire: `[tag, payload]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub tag: String,
    pub payload: Value,
}

impl Operation {
    /// Build an operation with a known tag and an object payload.
    pub fn new(tag: impl Into<String>, payload: Value) -> ClientResult<Self> {
        let op = Self {
            tag: tag.into(),
            payload,
        };
        op.validate()?;
        Ok(op)
    }

    pub fn validate(&self) -> ClientResult<()> {
        if !is_known_tag(&self.tag) {
            return Err(ClientError::Validation(format!(
                "operation '{}' is unsupported",
                self.tag
            )));
        }
        if !self.payload.is_object() {
            return Err(ClientError::Validation(format!(
                "payload of '{}' must be an object",
                self.tag
            )));
        }
        Ok(())
    }

    /// Whether a `custom_json` carries active-level `required_auths`.
    pub fn has_required_auths(&self) -> bool {
        self.payload
            .get("required_auths")
            .and_then(Value::as_array)
            .map(|auths| !auths.is_empty())
            .unwrap_or(false)
    }
}

impl Serialize for Operation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(2)?;
        tuple.serialize_element(&self.tag)?;
        tuple.serialize_element(&self.payload)?;
        tuple.end()
    }
}

impl<'de> Deserialize<'de> for Operation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (tag, payload) = <(String, Value)>::deserialize(deserializer)?;
        Ok(Self { tag, payload })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Asset {
    Hive,
    Hbd,
    Vests,
}

impl Asset {
    pub fn symbol(self) -> &'static str {
        match self {
            Asset::Hive => "HIVE",
            Asset::Hbd => "HBD",
            Asset::Vests => "VESTS",
        }
    }

    pub fn precision(self) -> u32 {
        match self {
            Asset::Hive | Asset::Hbd => 3,
            Asset::Vests => 6,
        }
    }
}

impl FromStr for Asset {
    type Err = ClientError;

    fn from_str(s: &str) -> ClientResult<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HIVE" => Ok(Asset::Hive),
            "HBD" => Ok(Asset::Hbd),
            "VESTS" => Ok(Asset::Vests),
            other => Err(ClientError::Validation(format!("unknown asset '{}'", other))),
        }
    }
}

/// A positive amount held as integer base units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Amount {
    units: u64,
    asset: Asset,
}

impl Amount {
    pub fn new(units: u64, asset: Asset) -> ClientResult<Self> {
        if units == 0 {
            return Err(ClientError::Validation(format!(
                "amount must be at least one base unit of {}",
                asset.symbol()
            )));
        }
        Ok(Self { units, asset })
    }

    pub fn units(&self) -> u64 {
        self.units
    }

    pub fn asset(&self) -> Asset {
        self.asset
    }
}

impl FromStr for Amount {
    type Err = ClientError;

    /// Parses `"1.5 HIVE"`. More decimals than the asset's precision is an error.
    fn from_str(s: &str) -> ClientResult<Self> {
        let invalid = || ClientError::Validation(format!("invalid amount '{}'", s));

        let mut parts = s.split_whitespace();
        let number = parts.next().ok_or_else(invalid)?;
        let asset: Asset = parts.next().ok_or_else(invalid)?.parse()?;
        if parts.next().is_some() {
            return Err(invalid());
        }

        let precision = asset.precision();
        let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
        let digits_only = |t: &str| t.chars().all(|c| c.is_ascii_digit());
        if whole.is_empty() || !digits_only(whole) || !digits_only(fraction) {
            return Err(invalid());
        }
        if fraction.len() > precision as usize {
            return Err(ClientError::Validation(format!(
                "{} allows at most {} decimals",
                asset.symbol(),
                precision
            )));
        }

        let scale = 10u64.pow(precision);
        let whole: u64 = whole.parse().map_err(|_| invalid())?;
        let padded = format!("{:0<width$}", fraction, width = precision as usize);
        let fraction: u64 = if padded.is_empty() { 0 } else { padded.parse().map_err(|_| invalid())? };

        let units = whole
            .checked_mul(scale)
            .and_then(|u| u.checked_add(fraction))
            .ok_or_else(invalid)?;
        Amount::new(units, asset)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let precision = self.asset.precision();
        let scale = 10u64.pow(precision);
        write!(
            f,
            "{}.{:0width$} {}",
            self.units / scale,
            self.units % scale,
            self.asset.symbol(),
            width = precision as usize
        )
    }
}

/// 3 to 16 chars, lowercase letter first, then `[a-z0-9.-]`.
pub fn validate_account_name(name: &str) -> ClientResult<()> {
    let bad = |why: &str| ClientError::Validation(format!("invalid account name '{}': {}", name, why));

    if !(3..=16).contains(&name.len()) {
        return Err(bad("length must be 3-16"));
    }
    let mut chars = name.chars();
    if !chars.next().map(|c| c.is_ascii_lowercase()).unwrap_or(false) {
        return Err(bad("must start with a lowercase letter"));
    }
    if !chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '-') {
        return Err(bad("only a-z, 0-9, '.' and '-' are allowed"));
    }
    Ok(())
}

pub fn validate_permlink(permlink: &str) -> ClientResult<()> {
    let ok = !permlink.is_empty()
        && permlink.len() <= MAX_PERMLINK_LEN
        && permlink
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '%');
    if ok {
        Ok(())
    } else {
        Err(ClientError::Validation(format!("invalid permlink '{}'", permlink)))
    }
}

pub fn validate_custom_json_id(id: &str) -> ClientResult<()> {
    let ok = !id.is_empty()
        && id.len() <= MAX_CUSTOM_ID_LEN
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if ok {
        Ok(())
    } else {
        Err(ClientError::Validation(format!(
            "custom_json id '{}' must be 1-{} chars of [A-Za-z0-9_-]",
            id, MAX_CUSTOM_ID_LEN
        )))
    }
}

fn validate_memo(memo: &str) -> ClientResult<()> {
    if memo.len() > MAX_MEMO_BYTES {
        return Err(ClientError::Validation(format!(
            "memo is {} bytes, limit is {}",
            memo.len(),
            MAX_MEMO_BYTES
        )));
    }
    Ok(())
}

pub fn vote(voter: &str, author: &str, permlink: &str, weight: i16) -> ClientResult<Operation> {
    validate_account_name(voter)?;
    validate_account_name(author)?;
    validate_permlink(permlink)?;
    if !(-MAX_VOTE_WEIGHT..=MAX_VOTE_WEIGHT).contains(&weight) {
        return Err(ClientError::Validation(format!(
            "vote weight {} outside [-{max}, {max}]",
            weight,
            max = MAX_VOTE_WEIGHT
        )));
    }
    Operation::new(
        "vote",
        json!({"voter": voter, "author": author, "permlink": permlink, "weight": weight}),
    )
}

fn liquid(amount: &Amount) -> ClientResult<()> {
    match amount.asset() {
        Asset::Hive | Asset::Hbd => Ok(()),
        Asset::Vests => Err(ClientError::Validation("VESTS cannot be transferred".into())),
    }
}

pub fn transfer(from: &str, to: &str, amount: &Amount, memo: &str) -> ClientResult<Operation> {
    validate_account_name(from)?;
    validate_account_name(to)?;
    if from == to {
        return Err(ClientError::Validation("receiver must differ from sender".into()));
    }
    liquid(amount)?;
    validate_memo(memo)?;
    Operation::new(
        "transfer",
        json!({"from": from, "to": to, "amount": amount.to_string(), "memo": memo}),
    )
}

pub fn transfer_to_savings(from: &str, to: &str, amount: &Amount, memo: &str) -> ClientResult<Operation> {
    validate_account_name(from)?;
    validate_account_name(to)?;
    liquid(amount)?;
    validate_memo(memo)?;
    Operation::new(
        "transfer_to_savings",
        json!({"from": from, "to": to, "amount": amount.to_string(), "memo": memo}),
    )
}

/// Power up. HIVE only, and there is no memo field.
pub fn transfer_to_vesting(from: &str, to: &str, amount: &Amount) -> ClientResult<Operation> {
    validate_account_name(from)?;
    validate_account_name(to)?;
    if amount.asset() != Asset::Hive {
        return Err(ClientError::Validation("only HIVE can be vested".into()));
    }
    Operation::new(
        "transfer_to_vesting",
        json!({"from": from, "to": to, "amount": amount.to_string()}),
    )
}

pub fn custom_json(
    id: &str,
    data: &Value,
    required_auths: &[String],
    required_posting_auths: &[String],
) -> ClientResult<Operation> {
    validate_custom_json_id(id)?;
    if !(data.is_object() || data.is_array()) {
        return Err(ClientError::Validation(
            "custom_json data must be an object or array".into(),
        ));
    }
    for account in required_auths.iter().chain(required_posting_auths) {
        validate_account_name(account)?;
    }
    if required_auths.is_empty() && required_posting_auths.is_empty() {
        return Err(ClientError::Validation(
            "custom_json needs at least one required account".into(),
        ));
    }
    Operation::new(
        "custom_json",
        json!({
            "required_auths": required_auths,
            "required_posting_auths": required_posting_auths,
            "id": id,
            "json": data.to_string(),
        }),
    )
}

pub fn reblog(account: &str, author: &str, permlink: &str) -> ClientResult<Operation> {
    validate_account_name(author)?;
    validate_permlink(permlink)?;
    let data = json!(["reblog", {"account": account, "author": author, "permlink": permlink}]);
    custom_json("follow", &data, &[], &[account.to_string()])
}

/// Community names look like `hive-123456`.
pub fn validate_community(community: &str) -> ClientResult<()> {
    let valid = community
        .strip_prefix("hive-")
        .map(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
        .unwrap_or(false);
    if valid {
        Ok(())
    } else {
        Err(ClientError::Validation(format!(
            "invalid community '{}'",
            community
        )))
    }
}

fn limit_bytes(field: &str, text: &str, min: usize, max: usize) -> ClientResult<()> {
    if (min..=max).contains(&text.len()) {
        Ok(())
    } else {
        Err(ClientError::Validation(format!(
            "{} must be {} to {} bytes, got {}",
            field,
            min,
            max,
            text.len()
        )))
    }
}

fn single_line(field: &str, text: &str) -> ClientResult<()> {
    if text.contains(['\r', '\n']) {
        return Err(ClientError::Validation(format!("{} must be a single line", field)));
    }
    Ok(())
}

/// Posts and replies. A root post has an empty `parent_author` and its
/// category or community as `parent_permlink`.
pub fn comment(
    parent_author: &str,
    parent_permlink: &str,
    author: &str,
    permlink: &str,
    title: &str,
    body: &str,
    json_metadata: &Value,
) -> ClientResult<Operation> {
    if !parent_author.is_empty() {
        validate_account_name(parent_author)?;
    }
    validate_permlink(parent_permlink)?;
    validate_account_name(author)?;
    validate_permlink(permlink)?;
    single_line("title", title)?;
    limit_bytes("title", title, 0, MAX_TITLE_BYTES)?;
    if parent_author.is_empty() && title.is_empty() {
        return Err(ClientError::Validation("a post needs a title".into()));
    }
    if body.is_empty() {
        return Err(ClientError::Validation("body must not be empty".into()));
    }
    if !json_metadata.is_object() {
        return Err(ClientError::Validation("json_metadata must be an object".into()));
    }
    Operation::new(
        "comment",
        json!({
            "parent_author": parent_author,
            "parent_permlink": parent_permlink,
            "author": author,
            "permlink": permlink,
            "title": title,
            "body": body,
            "json_metadata": json_metadata.to_string(),
        }),
    )
}

/// Permlink derived from a title: lowercase words joined by `-`.
pub fn permlink_from_title(title: &str) -> ClientResult<String> {
    let words: Vec<String> = title
        .split_whitespace()
        .map(|w| {
            w.chars()
                .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
                .collect::<String>()
                .to_ascii_lowercase()
        })
        .filter(|w| !w.is_empty())
        .collect();
    let mut permlink = words.join("-");
    permlink.truncate(MAX_PERMLINK_LEN);
    validate_permlink(&permlink)?;
    Ok(permlink)
}

/// `re-<parent>` plus an optional suffix, cut to the permlink limit.
pub fn reply_permlink(parent_permlink: &str, suffix: &str) -> String {
    format!("re-{}{}", parent_permlink, suffix)
        .chars()
        .take(MAX_PERMLINK_LEN)
        .collect()
}

/// URLs of markdown images (`![alt](url)`) in order of appearance.
pub fn markdown_images(body: &str) -> Vec<String> {
    let mut images = Vec::new();
    let mut rest = body;
    while let Some(start) = rest.find("![") {
        rest = &rest[start + 2..];
        let Some(close) = rest.find("](") else { break };
        if rest[..close].contains(']') {
            continue;
        }
        let after = &rest[close + 2..];
        let Some(end) = after.find(')') else { break };
        if end > 0 {
            images.push(after[..end].to_string());
        }
        rest = &after[end..];
    }
    images
}

/// Tags normalized to lowercase `[a-z0-9-]`, empty and repeated ones dropped.
pub fn normalize_tags<S: AsRef<str>>(tags: &[S]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag: String = tag
            .as_ref()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
            .collect::<String>()
            .to_ascii_lowercase();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

fn community_op(account: &str, action: &str, data: Value) -> ClientResult<Operation> {
    custom_json("community", &json!([action, data]), &[], &[account.to_string()])
}

pub fn community_subscription(account: &str, community: &str, subscribe: bool) -> ClientResult<Operation> {
    validate_community(community)?;
    let action = if subscribe { "subscribe" } else { "unsubscribe" };
    community_op(account, action, json!({"community": community}))
}

/// `mutePost` / `unmutePost` with a moderator note.
pub fn mute_post(
    moderator: &str,
    community: &str,
    author: &str,
    permlink: &str,
    notes: &str,
    mute: bool,
) -> ClientResult<Operation> {
    validate_community(community)?;
    validate_account_name(author)?;
    validate_permlink(permlink)?;
    limit_bytes("notes", notes, 1, MAX_COMMUNITY_TEXT_BYTES)?;
    let action = if mute { "mutePost" } else { "unmutePost" };
    community_op(
        moderator,
        action,
        json!({"community": community, "account": author, "permlink": permlink, "notes": notes}),
    )
}

/// `pinPost` / `unpinPost`.
pub fn pin_post(
    moderator: &str,
    community: &str,
    author: &str,
    permlink: &str,
    pin: bool,
) -> ClientResult<Operation> {
    validate_community(community)?;
    validate_account_name(author)?;
    validate_permlink(permlink)?;
    let action = if pin { "pinPost" } else { "unpinPost" };
    community_op(
        moderator,
        action,
        json!({"community": community, "account": author, "permlink": permlink}),
    )
}

pub fn flag_post(
    account: &str,
    community: &str,
    author: &str,
    permlink: &str,
    notes: &str,
) -> ClientResult<Operation> {
    validate_community(community)?;
    validate_account_name(author)?;
    validate_permlink(permlink)?;
    limit_bytes("notes", notes, 1, MAX_COMMUNITY_TEXT_BYTES)?;
    community_op(
        account,
        "flagPost",
        json!({"community": community, "account": author, "permlink": permlink, "notes": notes}),
    )
}

/// Editable community settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommunityProps {
    pub title: String,
    pub about: String,
    pub is_nsfw: bool,
    pub description: String,
    pub flag_text: String,
}

impl CommunityProps {
    pub fn validate(&self) -> ClientResult<()> {
        single_line("title", &self.title)?;
        limit_bytes("title", &self.title, 1, MAX_COMMUNITY_TITLE_BYTES)?;
        single_line("about", &self.about)?;
        limit_bytes("about", &self.about, 0, MAX_COMMUNITY_ABOUT_BYTES)?;
        limit_bytes("description", &self.description, 0, MAX_COMMUNITY_TEXT_BYTES)?;
        limit_bytes("flag_text", &self.flag_text, 0, MAX_COMMUNITY_TEXT_BYTES)
    }
}

/// `updateProps`.
pub fn update_community(admin: &str, community: &str, props: &CommunityProps) -> ClientResult<Operation> {
    validate_community(community)?;
    props.validate()?;
    let props = serde_json::to_value(props)?;
    community_op(admin, "updateProps", json!({"community": community, "props": props}))
}
