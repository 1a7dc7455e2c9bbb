//! Supported AppBase APIs and their methods.
//!
//! Calls are checked against this table before anything goes on the wire.
//! `condenser_api` takes positional (array) params; every other API takes
//! named (object) params.

use serde_json::Value;

use crate::error::{ClientError, ClientResult};

/// How an API expects its `params` member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamShape {
    Positional,
    Named,
}

#[derive(Debug)]
pub struct ApiSpec {
    pub name: &'static str,
    pub shape: ParamShape,
    pub methods: &'static [&'static str],
}

impl ApiSpec {
    pub fn supports(&self, method: &str) -> bool {
        self.methods.contains(&method)
    }

    /// Params used when the caller passes none.
    pub fn empty_params(&self) -> Value {
        match self.shape {
            ParamShape::Positional => Value::Array(Vec::new()),
            ParamShape::Named => Value::Object(serde_json::Map::new()),
        }
    }
}

pub const APIS: &[ApiSpec] = &[
    ApiSpec {
        name: "condenser_api",
        shape: ParamShape::Positional,
        methods: &[
            "broadcast_block",
            "broadcast_transaction",
            "broadcast_transaction_synchronous",
            "find_proposals",
            "find_rc_accounts",
            "find_recurrent_transfers",
            "get_account_count",
            "get_account_history",
            "get_account_reputations",
            "get_accounts",
            "get_active_votes",
            "get_active_witnesses",
            "get_block",
            "get_block_header",
            "get_blog",
            "get_blog_authors",
            "get_blog_entries",
            "get_chain_properties",
            "get_collateralized_conversion_requests",
            "get_comment_discussions_by_payout",
            "get_config",
            "get_content",
            "get_content_replies",
            "get_conversion_requests",
            "get_current_median_history_price",
            "get_discussions_by_active",
            "get_discussions_by_author_before_date",
            "get_discussions_by_blog",
            "get_discussions_by_cashout",
            "get_discussions_by_children",
            "get_discussions_by_comments",
            "get_discussions_by_created",
            "get_discussions_by_feed",
            "get_discussions_by_hot",
            "get_discussions_by_promoted",
            "get_discussions_by_trending",
            "get_discussions_by_votes",
            "get_dynamic_global_properties",
            "get_escrow",
            "get_expiring_vesting_delegations",
            "get_feed",
            "get_feed_entries",
            "get_feed_history",
            "get_follow_count",
            "get_followers",
            "get_following",
            "get_hardfork_version",
            "get_key_references",
            "get_market_history",
            "get_market_history_buckets",
            "get_next_scheduled_hardfork",
            "get_open_orders",
            "get_ops_in_block",
            "get_order_book",
            "get_owner_history",
            "get_post_discussions_by_payout",
            "get_potential_signatures",
            "get_reblogged_by",
            "get_recent_trades",
            "get_recovery_request",
            "get_replies_by_last_update",
            "get_required_signatures",
            "get_reward_fund",
            "get_savings_withdraw_from",
            "get_savings_withdraw_to",
            "get_state",
            "get_tags_used_by_author",
            "get_ticker",
            "get_trade_history",
            "get_transaction",
            "get_transaction_hex",
            "get_trending_tags",
            "get_version",
            "get_vesting_delegations",
            "get_volume",
            "get_withdraw_routes",
            "get_witness_by_account",
            "get_witness_count",
            "get_witness_schedule",
            "get_witnesses",
            "get_witnesses_by_vote",
            "is_known_transaction",
            "list_proposal_votes",
            "list_proposals",
            "list_rc_accounts",
            "list_rc_direct_delegations",
            "lookup_account_names",
            "lookup_accounts",
            "lookup_witness_accounts",
            "verify_authority",
        ],
    },
    ApiSpec {
        name: "account_by_key_api",
        shape: ParamShape::Named,
        methods: &["get_key_references"],
    },
    ApiSpec {
        name: "account_history_api",
        shape: ParamShape::Named,
        methods: &[
            "enum_virtual_ops",
            "get_account_history",
            "get_ops_in_block",
            "get_transaction",
        ],
    },
    ApiSpec {
        name: "block_api",
        shape: ParamShape::Named,
        methods: &["get_block", "get_block_header", "get_block_range"],
    },
    ApiSpec {
        name: "bridge",
        shape: ParamShape::Named,
        methods: &[
            "account_notifications",
            "does_user_follow_any_lists",
            "get_account_posts",
            "get_community",
            "get_community_context",
            "get_discussion",
            "get_follow_list",
            "get_payout_stats",
            "get_post",
            "get_post_header",
            "get_profile",
            "get_ranked_posts",
            "get_relationship_between_accounts",
            "list_all_subscriptions",
            "list_communities",
            "list_community_roles",
            "list_pop_communities",
            "list_subscribers",
        ],
    },
    ApiSpec {
        name: "database_api",
        shape: ParamShape::Named,
        methods: &[
            "find_account_recovery_requests",
            "find_accounts",
            "find_change_recovery_account_requests",
            "find_collateralized_conversion_requests",
            "find_comments",
            "find_decline_voting_rights_requests",
            "find_escrows",
            "find_hbd_conversion_requests",
            "find_limit_orders",
            "find_owner_histories",
            "find_proposals",
            "find_recurrent_transfers",
            "find_savings_withdrawals",
            "find_vesting_delegation_expirations",
            "find_vesting_delegations",
            "find_votes",
            "find_withdraw_vesting_routes",
            "find_witnesses",
            "get_active_witnesses",
            "get_comment_pending_payouts",
            "get_config",
            "get_current_price_feed",
            "get_dynamic_global_properties",
            "get_feed_history",
            "get_hardfork_properties",
            "get_order_book",
            "get_potential_signatures",
            "get_required_signatures",
            "get_reward_funds",
            "get_transaction_hex",
            "get_version",
            "get_witness_schedule",
            "is_known_transaction",
            "list_account_recovery_requests",
            "list_accounts",
            "list_change_recovery_account_requests",
            "list_collateralized_conversion_requests",
            "list_comments",
            "list_decline_voting_rights_requests",
            "list_escrows",
            "list_hbd_conversion_requests",
            "list_limit_orders",
            "list_owner_histories",
            "list_proposal_votes",
            "list_proposals",
            "list_savings_withdrawals",
            "list_vesting_delegation_expirations",
            "list_vesting_delegations",
            "list_votes",
            "list_withdraw_vesting_routes",
            "list_witness_votes",
            "list_witnesses",
            "verify_authority",
            "verify_signatures",
        ],
    },
    ApiSpec {
        name: "follow_api",
        shape: ParamShape::Named,
        methods: &[
            "get_account_reputations",
            "get_blog",
            "get_blog_authors",
            "get_blog_entries",
            "get_feed",
            "get_feed_entries",
            "get_follow_count",
            "get_followers",
            "get_following",
            "get_reblogged_by",
        ],
    },
    ApiSpec {
        name: "market_history_api",
        shape: ParamShape::Named,
        methods: &[
            "get_market_history",
            "get_market_history_buckets",
            "get_order_book",
            "get_recent_trades",
            "get_ticker",
            "get_trade_history",
            "get_volume",
        ],
    },
    ApiSpec {
        name: "network_broadcast_api",
        shape: ParamShape::Named,
        methods: &["broadcast_block", "broadcast_transaction"],
    },
    ApiSpec {
        name: "rc_api",
        shape: ParamShape::Named,
        methods: &["find_rc_accounts", "get_resource_params", "get_resource_pool"],
    },
    ApiSpec {
        name: "reputation_api",
        shape: ParamShape::Named,
        methods: &["get_account_reputations"],
    },
];

/// Canonical API name. `condenser` and `condenser_api` are the same API;
/// `bridge` has no suffix.
pub fn normalize_api(name: &str) -> String {
    let base = name.trim().trim_end_matches("_api");
    if base == "bridge" {
        base.to_string()
    } else {
        format!("{}_api", base)
    }
}

/// Find the API entry for `(api, method)`, rejecting anything unlisted.
pub fn lookup(api: &str, method: &str) -> ClientResult<&'static ApiSpec> {
    let name = normalize_api(api);
    let spec = APIS
        .iter()
        .find(|s| s.name == name)
        .ok_or_else(|| ClientError::Validation(format!("API '{}' is unsupported", api)))?;

    if !spec.supports(method) {
        return Err(ClientError::Validation(format!(
            "method '{}.{}' is unsupported",
            spec.name, method
        )));
    }
    Ok(spec)
}

/// Check that `params` has the shape `spec` expects.
pub fn check_params(spec: &ApiSpec, method: &str, params: &Value) -> ClientResult<()> {
    let ok = match spec.shape {
        ParamShape::Positional => params.is_array(),
        ParamShape::Named => params.is_object(),
    };
    if ok {
        Ok(())
    } else {
        let expected = match spec.shape {
            ParamShape::Positional => "an array",
            ParamShape::Named => "an object",
        };
        Err(ClientError::Validation(format!(
            "params for {}.{} must be {}",
            spec.name, method, expected
        )))
    }
}
