//! Authority resolution: which single key signs a transaction.

use std::fmt;
use std::str::FromStr;

use crate::blockchain::operations::Operation;
use crate::blockchain::wallet::{KeyRing, PrivateKey};
use crate::error::{ClientError, ClientResult};

/// Key roles, most privileged first. `Ord` follows that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AuthorityRole {
    Owner,
    Active,
    Posting,
    Memo,
}

impl AuthorityRole {
    pub const ALL: [AuthorityRole; 4] = [
        AuthorityRole::Owner,
        AuthorityRole::Active,
        AuthorityRole::Posting,
        AuthorityRole::Memo,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AuthorityRole::Owner => "owner",
            AuthorityRole::Active => "active",
            AuthorityRole::Posting => "posting",
            AuthorityRole::Memo => "memo",
        }
    }
}

impl fmt::Display for AuthorityRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthorityRole {
    type Err = ClientError;

    fn from_str(s: &str) -> ClientResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "owner" => Ok(AuthorityRole::Owner),
            "active" => Ok(AuthorityRole::Active),
            "posting" => Ok(AuthorityRole::Posting),
            "memo" => Ok(AuthorityRole::Memo),
            other => Err(ClientError::Configuration(format!("unknown role '{}'", other))),
        }
    }
}

use AuthorityRole::{Active, Owner, Posting};

const SOCIAL: &[AuthorityRole] = &[Posting, Active, Owner];
const POSTING_ONLY: &[AuthorityRole] = &[Posting];
const ACTIVE_ONLY: &[AuthorityRole] = &[Active];
const FINANCIAL: &[AuthorityRole] = &[Active, Owner];
const OWNER_ONLY: &[AuthorityRole] = &[Owner];

/// Acceptable roles for `tag`, least privileged first.
///
/// `custom_json` depends on whether it names any `required_auths`.
pub fn acceptable_roles(tag: &str, has_required_auths: bool) -> &'static [AuthorityRole] {
    match tag {
        "vote" | "comment" | "comment_options" | "delete_comment" | "claim_reward_balance" => SOCIAL,
        "custom_json" if has_required_auths => ACTIVE_ONLY,
        "custom_json" => POSTING_ONLY,
        "change_recovery_account"
        | "request_account_recovery"
        | "recover_account"
        | "set_reset_account"
        | "reset_account" => OWNER_ONLY,
        _ => FINANCIAL,
    }
}

pub fn roles_for(op: &Operation) -> &'static [AuthorityRole] {
    acceptable_roles(&op.tag, op.has_required_auths())
}

/// The operation whose cheapest acceptable role is the most privileged.
/// Ties go to the earliest operation.
pub fn dominant_operation(operations: &[Operation]) -> Option<&Operation> {
    let floor = |op: &Operation| roles_for(op).first().copied().unwrap_or(Owner);
    operations.iter().reduce(|best, op| {
        if floor(op) < floor(best) {
            op
        } else {
            best
        }
    })
}

/// Roles every operation in the list accepts, least privileged first.
///
/// Ordered like the dominant operation's list. Empty when the operations
/// cannot share one signing key.
pub fn common_roles(operations: &[Operation]) -> Vec<AuthorityRole> {
    let Some(dominant) = dominant_operation(operations) else {
        return Vec::new();
    };
    roles_for(dominant)
        .iter()
        .copied()
        .filter(|role| operations.iter().all(|op| roles_for(op).contains(role)))
        .collect()
}

/// First role accepted by every operation that the key ring holds.
pub fn resolve<'k>(
    operations: &[Operation],
    keys: &'k KeyRing,
) -> ClientResult<(AuthorityRole, &'k PrivateKey)> {
    if operations.is_empty() {
        return Err(ClientError::Validation("transaction has no operations".into()));
    }

    let acceptable = common_roles(operations);
    if acceptable.is_empty() {
        let tags: Vec<_> = operations.iter().map(|op| op.tag.as_str()).collect();
        return Err(ClientError::Authority(format!(
            "no single role can sign [{}]",
            tags.join(", ")
        )));
    }

    acceptable
        .iter()
        .find_map(|&role| keys.get(role).map(|key| (role, key)))
        .ok_or_else(|| {
            let names: Vec<_> = acceptable.iter().map(|r| r.as_str()).collect();
            ClientError::Authority(format!(
                "transaction needs one of these keys: {}",
                names.join(", ")
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn op(tag: &str) -> Operation {
        Operation::new(tag, json!({})).unwrap()
    }

    fn key(n: u8) -> PrivateKey {
        PrivateKey::from_bytes(&[n; 32]).unwrap()
    }

    fn full_ring() -> KeyRing {
        KeyRing::new()
            .with_key(Owner, key(1))
            .with_key(Active, key(2))
            .with_key(Posting, key(3))
    }

    #[test]
    fn test_role_order() {
        assert!(Owner < Active && Active < Posting && Posting < AuthorityRole::Memo);
        assert_eq!("Posting".parse::<AuthorityRole>().unwrap(), Posting);
        assert!("root".parse::<AuthorityRole>().is_err());
    }

    #[test]
    fn test_custom_json_without_auths_never_escalates() {
        let plain = Operation::new(
            "custom_json",
            json!({"required_auths": [], "required_posting_auths": ["alice"], "id": "x", "json": "{}"}),
        )
        .unwrap();
        let (role, _) = resolve(&[plain.clone()], &full_ring()).unwrap();
        assert_eq!(role, Posting);

        let ring = KeyRing::new().with_key(Active, key(2)).with_key(Owner, key(1));
        assert!(matches!(resolve(&[plain], &ring), Err(ClientError::Authority(_))));
    }

    #[test]
    fn test_custom_json_with_auths_needs_active() {
        let op = Operation::new(
            "custom_json",
            json!({"required_auths": ["alice"], "required_posting_auths": [], "id": "x", "json": "{}"}),
        )
        .unwrap();
        let (role, _) = resolve(&[op.clone()], &full_ring()).unwrap();
        assert_eq!(role, Active);

        let ring = KeyRing::new().with_key(Owner, key(1));
        assert!(resolve(&[op], &ring).is_err());
    }

    #[test]
    fn test_least_privileged_key_wins() {
        let (role, _) = resolve(&[op("vote")], &full_ring()).unwrap();
        assert_eq!(role, Posting);

        let ring = KeyRing::new().with_key(Owner, key(1));
        let (role, _) = resolve(&[op("vote")], &ring).unwrap();
        assert_eq!(role, Owner);
    }

    #[test]
    fn test_dominant_operation() {
        let ops = [op("vote"), op("transfer"), op("comment")];
        assert_eq!(dominant_operation(&ops).map(|o| o.tag.as_str()), Some("transfer"));

        let (role, _) = resolve(&ops, &full_ring()).unwrap();
        assert_eq!(role, Active);

        let ops = [op("transfer"), op("recover_account")];
        let (role, _) = resolve(&ops, &full_ring()).unwrap();
        assert_eq!(role, Owner);
    }

    fn plain_custom_json() -> Operation {
        Operation::new(
            "custom_json",
            json!({"required_auths": [], "required_posting_auths": ["alice"], "id": "x", "json": "{}"}),
        )
        .unwrap()
    }

    #[test]
    fn test_posting_only_op_never_escalates_in_any_order() {
        let active_only = KeyRing::new().with_key(Active, key(2));
        for ops in [
            [op("vote"), plain_custom_json()],
            [plain_custom_json(), op("vote")],
        ] {
            assert_eq!(common_roles(&ops), vec![Posting]);
            assert!(matches!(resolve(&ops, &active_only), Err(ClientError::Authority(_))));

            let (role, _) = resolve(&ops, &full_ring()).unwrap();
            assert_eq!(role, Posting);
        }
    }

    #[test]
    fn test_disjoint_roles_rejected() {
        let ops = [op("transfer"), plain_custom_json()];
        assert!(common_roles(&ops).is_empty());
        assert!(matches!(resolve(&ops, &full_ring()), Err(ClientError::Authority(_))));
    }

    #[test]
    fn test_memo_key_never_signs() {
        let ring = KeyRing::new().with_key(AuthorityRole::Memo, key(4));
        assert!(matches!(resolve(&[op("vote")], &ring), Err(ClientError::Authority(_))));
    }

    #[test]
    fn test_empty_operations() {
        assert!(matches!(resolve(&[], &full_ring()), Err(ClientError::Validation(_))));
    }
}
