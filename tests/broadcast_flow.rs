//! End-to-end broadcast tests: in-memory transport and a real HTTP mock node.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::{json, Value};

use hive_broadcaster::blockchain::authority::AuthorityRole;
use hive_broadcaster::blockchain::signature::{recover_public_key, signature_digest};
use hive_broadcaster::blockchain::{
    BroadcastOptions, Broadcaster, ChainId, CompactSignature, KeyRing, Operation, PrivateKey,
};
use hive_broadcaster::resilience::RetryPolicy;
use hive_broadcaster::rpc::{HttpTransport, MockTransport, NodeList, RpcClient};
use hive_broadcaster::{ClientConfig, ClientError, HiveClient};

mod common;

const SERIALIZED: &str = "a08601000000e803000000010576b07465737400";

fn key(byte: u8) -> PrivateKey {
    PrivateKey::from_bytes(&[byte; 32]).unwrap()
}

fn options() -> BroadcastOptions {
    BroadcastOptions {
        expiration_secs: 30,
        synchronous: false,
        strict: true,
        verify: false,
    }
}

/// Hive-like node: TaPoS data, fixed serialization, accepts every broadcast.
async fn start_chain_node(seen: Arc<Mutex<Vec<Value>>>) -> String {
    let addr = common::start_programmable_node(move |request| {
        let seen = seen.clone();
        async move {
            seen.lock().push(request.clone());
            let result = match request["method"].as_str().unwrap_or_default() {
                "database_api.get_dynamic_global_properties" => json!({
                    "head_block_number": 5_000_003u64,
                    "head_block_id": "004c4b43aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
                    "time": "2024-01-01T00:00:00"
                }),
                "block_api.get_block_header" => json!({
                    "header": {
                        "previous": "004c4b40112233445566778899aabbccddeeff00",
                        "timestamp": "2024-01-01T00:00:00",
                        "witness": "w"
                    }
                }),
                "condenser_api.get_transaction_hex" => json!(SERIALIZED),
                "condenser_api.get_version" | "database_api.get_version" => json!({
                    "blockchain_version": "1.27.0",
                    "chain_id": ChainId::HIVE_MAINNET.to_string()
                }),
                "condenser_api.verify_authority" => json!(true),
                _ => json!({}),
            };
            (200, common::result_body(&request, result))
        }
    })
    .await;
    common::url(addr)
}

fn submitted(seen: &[Value]) -> Value {
    seen.iter()
        .find(|r| {
            r["method"]
                .as_str()
                .is_some_and(|m| m.starts_with("condenser_api.broadcast_transaction"))
        })
        .map(|r| r["params"][0].clone())
        .expect("no broadcast request")
}

#[tokio::test]
async fn test_vote_over_http_recovers_signer() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let url = start_chain_node(seen.clone()).await;

    let config = ClientConfig {
        nodes: vec![url],
        account: Some("alice".into()),
        ..ClientConfig::default()
    };
    let posting = key(7);
    let expected_public = posting.public_key_compressed();
    let keys = KeyRing::new().with_key(AuthorityRole::Posting, posting);

    let client = HiveClient::connect(&config, keys).await.unwrap();
    let receipt = client
        .vote("bob", "a-post", 5000, &client.broadcast_options())
        .await
        .unwrap();
    assert_eq!(receipt.transaction_id.len(), 40);

    let seen = seen.lock();
    let tx = submitted(&seen);
    // (5_000_003 - 3) & 0xFFFF and bytes 4..8 of the previous id, little-endian
    assert_eq!(tx["ref_block_num"], 5_000_000u64 & 0xFFFF);
    assert_eq!(tx["ref_block_prefix"], 0x4433_2211u64);
    assert_eq!(tx["operations"][0][0], "vote");
    assert_eq!(tx["operations"][0][1]["weight"], 5000);

    let signatures = tx["signatures"].as_array().unwrap();
    assert_eq!(signatures.len(), 1);
    let signature: CompactSignature = signatures[0].as_str().unwrap().parse().unwrap();
    let digest = signature_digest(&ChainId::HIVE_MAINNET, SERIALIZED).unwrap();
    assert_eq!(recover_public_key(&digest, &signature).unwrap(), expected_public);
}

#[tokio::test]
async fn test_failover_during_broadcast() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let healthy = start_chain_node(seen.clone()).await;
    let down = common::url(common::closed_port().await);

    let nodes = NodeList::new([down, healthy]).unwrap();
    let transport =
        HttpTransport::new(nodes, Duration::from_secs(5), RetryPolicy::single_attempt()).unwrap();
    let rpc = RpcClient::new(Arc::new(transport));
    let keys = KeyRing::new().with_key(AuthorityRole::Active, key(9));

    let op = hive_broadcaster::blockchain::operations::transfer(
        "alice",
        "bob",
        &"1 HIVE".parse().unwrap(),
        "",
    )
    .unwrap();
    let receipt = Broadcaster::new(&rpc, ChainId::HIVE_MAINNET, &keys)
        .broadcast(vec![op], &options())
        .await
        .unwrap();

    assert_eq!(receipt.result, json!({}));
    assert_eq!(submitted(&seen.lock())["operations"][0][1]["amount"], "1.000 HIVE");
}

#[tokio::test]
async fn test_unknown_tag_rejected_before_network() {
    let mock = Arc::new(MockTransport::new());
    let rpc = RpcClient::new(mock.clone());
    let keys = KeyRing::new().with_key(AuthorityRole::Owner, key(1));

    let bogus = Operation {
        tag: "fill_order".into(),
        payload: json!({}),
    };
    let result = Broadcaster::new(&rpc, ChainId::HIVE_MAINNET, &keys)
        .broadcast(vec![bogus], &options())
        .await;

    assert!(matches!(result, Err(ClientError::Validation(_))));
    assert!(mock.requests().is_empty());
}

#[tokio::test]
async fn test_mixed_operations_use_most_privileged_role() {
    let mock = Arc::new(MockTransport::new().respond("condenser_api.get_transaction_hex", json!(SERIALIZED)));
    let rpc = RpcClient::new(mock.clone());

    let active = key(2);
    let active_public = active.public_key_compressed();
    let keys = KeyRing::new()
        .with_key(AuthorityRole::Posting, key(3))
        .with_key(AuthorityRole::Active, active);

    let ops = vec![
        hive_broadcaster::blockchain::operations::vote("alice", "bob", "post", 100).unwrap(),
        hive_broadcaster::blockchain::operations::transfer(
            "alice",
            "bob",
            &"0.001 HBD".parse().unwrap(),
            "",
        )
        .unwrap(),
    ];
    Broadcaster::new(&rpc, ChainId::HIVE_MAINNET, &keys)
        .broadcast(ops, &options())
        .await
        .unwrap();

    let request = mock
        .requests()
        .into_iter()
        .find(|r| r.method == "condenser_api.broadcast_transaction")
        .unwrap();
    let signature: CompactSignature = request.params[0]["signatures"][0]
        .as_str()
        .unwrap()
        .parse()
        .unwrap();
    let digest = signature_digest(&ChainId::HIVE_MAINNET, SERIALIZED).unwrap();
    assert_eq!(recover_public_key(&digest, &signature).unwrap(), active_public);
}

#[tokio::test]
async fn test_posting_key_cannot_sign_transfer() {
    let mock = Arc::new(MockTransport::new());
    let rpc = RpcClient::new(mock.clone());
    let keys = KeyRing::new().with_key(AuthorityRole::Posting, key(3));

    let op = hive_broadcaster::blockchain::operations::transfer(
        "alice",
        "bob",
        &"1.000 HIVE".parse().unwrap(),
        "",
    )
    .unwrap();
    let result = Broadcaster::new(&rpc, ChainId::HIVE_MAINNET, &keys)
        .broadcast(vec![op], &options())
        .await;

    assert!(matches!(result, Err(ClientError::Authority(_))));
    assert!(mock.requests().is_empty());
}

#[tokio::test]
async fn test_node_rejection_surfaces_as_rpc_error() {
    let mock = Arc::new(MockTransport::new().reject(
        "condenser_api.broadcast_transaction",
        -32003,
        "duplicate transaction",
    ));
    let rpc = RpcClient::new(mock.clone());
    let keys = KeyRing::new().with_key(AuthorityRole::Posting, key(3));
    let op = hive_broadcaster::blockchain::operations::vote("alice", "bob", "post", -100).unwrap();

    let strict = Broadcaster::new(&rpc, ChainId::HIVE_MAINNET, &keys)
        .broadcast(vec![op.clone()], &options())
        .await;
    assert!(matches!(strict, Err(ClientError::Rpc { code: -32003, .. })));

    let lenient = BroadcastOptions {
        strict: false,
        ..options()
    };
    let receipt = Broadcaster::new(&rpc, ChainId::HIVE_MAINNET, &keys)
        .broadcast(vec![op], &lenient)
        .await
        .unwrap();
    assert!(receipt.result.is_null());
}

#[tokio::test]
async fn test_active_key_never_signs_posting_only_batch() {
    use hive_broadcaster::blockchain::operations;

    let mock = Arc::new(MockTransport::new());
    let rpc = RpcClient::new(mock.clone());
    let keys = KeyRing::new().with_key(AuthorityRole::Active, key(2));

    let vote = operations::vote("alice", "bob", "post", 100).unwrap();
    let follow = operations::custom_json("follow", &json!(["follow", {}]), &[], &["alice".into()]).unwrap();

    for ops in [vec![vote.clone(), follow.clone()], vec![follow, vote]] {
        let result = Broadcaster::new(&rpc, ChainId::HIVE_MAINNET, &keys)
            .broadcast(ops, &options())
            .await;
        assert!(matches!(result, Err(ClientError::Authority(_))));
    }
    assert!(mock.requests().is_empty());
}
