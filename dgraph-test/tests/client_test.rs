use std::collections::BTreeSet;
use std::time::Duration;

use dgraph::common::error::StubError;
use dgraph::{Client, ClientConfig, Error, Mutation, Operation, RoundRobinSelector, TxnOptions};
use dgraph_test::{Call, MockCluster, Op};
use serde_json::json;

#[test]
fn test_empty_pool_is_rejected() {
    let err = Client::new(Vec::new()).unwrap_err();
    assert!(matches!(err, Error::NoClients));
}

#[test]
fn test_client_config() {
    let cluster = MockCluster::new(1);
    assert_eq!(cluster.client().query_timeout(), Duration::from_secs(600));

    let config = ClientConfig {
        query_timeout: Duration::from_secs(5),
    };
    let client = Client::with_config(cluster.dyn_stubs(), config.clone()).unwrap();
    assert_eq!(client.config(), &config);
    assert_eq!(client.stubs().len(), 1);
}

#[tokio::test]
async fn test_round_robin_dispatch() {
    let cluster = MockCluster::new(3);
    let client = cluster.client().with_selector(RoundRobinSelector::new());

    for _ in 0..6 {
        client.get_state().await.unwrap();
    }
    let stubs: Vec<_> = cluster.server.calls().iter().map(|c| c.stub).collect();
    assert_eq!(stubs, [0, 1, 2, 0, 1, 2]);
}

#[tokio::test]
async fn test_random_dispatch_stays_in_pool() {
    let cluster = MockCluster::new(3);
    let client = cluster.client();

    for _ in 0..200 {
        client.get_health(false).await.unwrap();
    }
    let stubs: BTreeSet<_> = cluster.server.calls().iter().map(|c| c.stub).collect();
    assert!(stubs.iter().all(|id| *id < 3));
    assert_eq!(stubs.len(), 3);
}

#[tokio::test]
async fn test_transaction_calls_spread_over_pool() {
    let cluster = MockCluster::new(2);
    let client = cluster.client().with_selector(RoundRobinSelector::new());
    let mut txn = client.new_txn(TxnOptions::default()).unwrap();

    txn.query("{ q }").await.unwrap();
    txn.mutate(Mutation::set_nquads("_:a <name> \"A\" ."))
        .await
        .unwrap();
    txn.commit().await.unwrap();

    let calls = cluster.server.calls();
    let stubs: Vec<_> = calls.iter().map(|c| c.stub).collect();
    assert_eq!(stubs, [0, 1, 0]);
    assert!(matches!(calls[2].call, Call::Commit(_)));
}

#[tokio::test]
async fn test_login() {
    let cluster = MockCluster::new(2);
    let client = cluster.client().with_selector(RoundRobinSelector::new());

    client.login("groot", "password").await.unwrap();
    assert_eq!(
        cluster.stubs[0].access_token().as_deref(),
        Some("access-groot-0")
    );
    assert!(cluster.stubs[0].refresh_token().is_some());
    assert!(cluster.stubs[1].access_token().is_none());

    let err = client.login("groot", "wrong").await.unwrap_err();
    assert!(matches!(err, Error::Api(_)));
    assert!(cluster.stubs[1].access_token().is_none());
}

#[tokio::test]
async fn test_login_into_namespace() {
    let cluster = MockCluster::new(1);
    let client = cluster.client();
    cluster.server.add_user("alice", "secret");

    client
        .login_into_namespace("alice", "secret", Some(2))
        .await
        .unwrap();
    assert_eq!(
        cluster.stubs[0].access_token().as_deref(),
        Some("access-alice-2")
    );
    assert_eq!(cluster.server.calls()[0].call, Call::Login {
        userid: "alice".into(),
        namespace: Some(2),
    });
}

#[tokio::test]
async fn test_logout_clears_every_stub() {
    let cluster = MockCluster::new(3);
    let client = cluster.client().with_selector(RoundRobinSelector::new());

    for _ in 0..3 {
        client.login("groot", "password").await.unwrap();
    }
    assert!(cluster.stubs.iter().all(|s| s.access_token().is_some()));

    client.logout();
    assert!(cluster.stubs.iter().all(|s| s.access_token().is_none()));
    assert!(cluster.stubs.iter().all(|s| s.refresh_token().is_none()));
}

#[test]
fn test_auth_settings_apply_to_every_stub() {
    let cluster = MockCluster::new(3);
    let client = cluster.client();

    client.set_alpha_auth_token("alpha-token");
    client.set_cloud_api_key("cloud-key");
    for stub in &cluster.stubs {
        assert_eq!(stub.alpha_auth_token().as_deref(), Some("alpha-token"));
        assert_eq!(stub.cloud_api_key().as_deref(), Some("cloud-key"));
    }
    assert!(cluster.server.calls().is_empty());
}

#[tokio::test]
async fn test_alter() {
    let cluster = MockCluster::new(1);
    let client = cluster.client();

    let schema = "name: string @index(exact) .";
    let payload = client.alter(&Operation::schema(schema)).await.unwrap();
    assert_eq!(payload.data["code"], json!("Success"));
    assert_eq!(cluster.server.schema(), [schema]);

    let err = client.alter(&Operation::default()).await.unwrap_err();
    assert!(matches!(err, Error::Transport(StubError::InvalidRequest(_))));
}

#[tokio::test]
async fn test_alter_drop() {
    let cluster = MockCluster::new(1);
    let client = cluster.client();

    let mut txn = client.new_txn(TxnOptions::default()).unwrap();
    let nquads = "<0x1> <name> \"A\" .\n<0x1> <age> \"3\" .";
    txn.mutate(Mutation::set_nquads(nquads).with_commit_now())
        .await
        .unwrap();
    assert!(cluster.server.is_committed("0x1-name"));

    client.alter(&Operation::drop_attr("name")).await.unwrap();
    assert!(!cluster.server.is_committed("0x1-name"));
    assert!(cluster.server.is_committed("0x1-age"));

    client.alter(&Operation::drop_all()).await.unwrap();
    assert!(!cluster.server.is_committed("0x1-age"));
    assert!(cluster.server.schema().is_empty());
    assert_eq!(cluster.server.count(Op::Alter), 2);
}

#[tokio::test]
async fn test_introspection() {
    let cluster = MockCluster::new(1);
    let client = cluster.client();

    let health = client.get_health(false).await.unwrap();
    assert_eq!(health["status"], json!("healthy"));
    let all = client.get_health(true).await.unwrap();
    assert_eq!(all.as_array().map(Vec::len), Some(1));

    let state = client.get_state().await.unwrap();
    assert!(state.get("groups").is_some());

    let keywords = client.fetch_ui_keywords().await.unwrap();
    assert!(
        keywords
            .keywords
            .iter()
            .any(|k| k.name == "eq" && k.kind == "function")
    );

    assert_eq!(cluster.server.calls()[1].call, Call::Health { all: true });
}
