//! Node failover tests against real HTTP mock nodes.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use hive_broadcaster::resilience::RetryPolicy;
use hive_broadcaster::rpc::{HttpTransport, NodeList, RpcClient, RpcOutcome, RpcRequest, Strictness, Transport};
use hive_broadcaster::ClientError;

mod common;

fn transport(urls: &[String]) -> HttpTransport {
    let nodes = NodeList::new(urls).unwrap();
    HttpTransport::new(nodes, Duration::from_secs(5), RetryPolicy::single_attempt()).unwrap()
}

fn props_request() -> RpcRequest {
    RpcRequest::new(1, "database_api.get_dynamic_global_properties", json!({}))
}

#[tokio::test]
async fn test_failing_nodes_skipped_in_order() {
    let refused = common::closed_port().await;
    let broken = common::start_fixed_node(500, "oops").await;
    let garbage = common::start_fixed_node(200, "<html>not json</html>").await;

    let hits = Arc::new(AtomicU32::new(0));
    let h = hits.clone();
    let healthy = common::start_programmable_node(move |request| {
        let h = h.clone();
        async move {
            h.fetch_add(1, Ordering::SeqCst);
            (200, common::result_body(&request, json!({"head_block_number": 42})))
        }
    })
    .await;

    let transport = transport(&[
        common::url(refused),
        common::url(broken),
        common::url(garbage),
        common::url(healthy),
    ]);

    let outcome = transport.send(&props_request()).await;
    assert_eq!(outcome, RpcOutcome::Success(json!({"head_block_number": 42})));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_first_healthy_node_wins() {
    let first_hits = Arc::new(AtomicU32::new(0));
    let second_hits = Arc::new(AtomicU32::new(0));

    let h = first_hits.clone();
    let first = common::start_programmable_node(move |request| {
        let h = h.clone();
        async move {
            h.fetch_add(1, Ordering::SeqCst);
            (200, common::result_body(&request, json!("first")))
        }
    })
    .await;
    let h = second_hits.clone();
    let second = common::start_programmable_node(move |request| {
        let h = h.clone();
        async move {
            h.fetch_add(1, Ordering::SeqCst);
            (200, common::result_body(&request, json!("second")))
        }
    })
    .await;

    let transport = transport(&[common::url(first), common::url(second)]);
    for _ in 0..3 {
        let outcome = transport.send(&props_request()).await;
        assert_eq!(outcome, RpcOutcome::Success(json!("first")));
    }
    assert_eq!(first_hits.load(Ordering::SeqCst), 3);
    assert_eq!(second_hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_rpc_error_stops_iteration() {
    let rejecting = common::start_programmable_node(|request| async move {
        (200, common::error_body(&request, -32000, "missing required posting authority"))
    })
    .await;

    let later_hits = Arc::new(AtomicU32::new(0));
    let h = later_hits.clone();
    let later = common::start_programmable_node(move |request| {
        let h = h.clone();
        async move {
            h.fetch_add(1, Ordering::SeqCst);
            (200, common::result_body(&request, json!({})))
        }
    })
    .await;

    let transport = transport(&[common::url(rejecting), common::url(later)]);
    match transport.send(&props_request()).await {
        RpcOutcome::RpcError(err) => {
            assert_eq!(err.code, -32000);
            assert!(err.message.contains("posting authority"));
        }
        other => panic!("expected RPC error, got {:?}", other),
    }
    assert_eq!(later_hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_all_nodes_down() {
    let a = common::closed_port().await;
    let b = common::start_fixed_node(503, "busy").await;

    let transport = transport(&[common::url(a), common::url(b)]);
    match transport.send(&props_request()).await {
        RpcOutcome::NetworkFailure(message) => {
            assert!(message.contains("all 2 nodes failed"));
            assert!(message.contains("503"));
        }
        other => panic!("expected network failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_gateway_status_retried_on_same_node() {
    let calls = Arc::new(AtomicU32::new(0));
    let c = calls.clone();
    let flaky = common::start_programmable_node(move |request| {
        let c = c.clone();
        async move {
            if c.fetch_add(1, Ordering::SeqCst) < 2 {
                (503, "Service Unavailable".into())
            } else {
                (200, common::result_body(&request, json!("recovered")))
            }
        }
    })
    .await;

    let config = hive_broadcaster::config::RetryConfig {
        max_attempts: 3,
        base_delay_ms: 10,
        max_delay_ms: 50,
        retry_statuses: vec![503],
    };
    let nodes = NodeList::new([common::url(flaky)]).unwrap();
    let transport =
        HttpTransport::new(nodes, Duration::from_secs(5), RetryPolicy::from_config(&config)).unwrap();

    let outcome = transport.send(&props_request()).await;
    assert_eq!(outcome, RpcOutcome::Success(json!("recovered")));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_strict_and_lenient_client() {
    let down = common::closed_port().await;
    let rpc = RpcClient::new(Arc::new(transport(&[common::url(down)])));

    let strict = rpc
        .call("database_api", "get_dynamic_global_properties", None, Strictness::Strict)
        .await;
    assert!(matches!(strict, Err(ClientError::Transport(_))));

    let lenient = rpc
        .call("database_api", "get_dynamic_global_properties", None, Strictness::Lenient)
        .await
        .unwrap();
    assert!(lenient.is_null());
}

#[tokio::test]
async fn test_request_envelope_on_the_wire() {
    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let s = seen.clone();
    let node = common::start_programmable_node(move |request| {
        let s = s.clone();
        async move {
            s.lock().push(request.clone());
            (200, common::result_body(&request, json!([])))
        }
    })
    .await;

    let rpc = RpcClient::new(Arc::new(transport(&[common::url(node)])));
    rpc.call("condenser_api", "get_accounts", Some(json!([["alice"]])), Strictness::Strict)
        .await
        .unwrap();

    let seen = seen.lock();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0]["jsonrpc"], "2.0");
    assert_eq!(seen[0]["method"], "condenser_api.get_accounts");
    assert_eq!(seen[0]["params"], json!([["alice"]]));
}
