//! End-to-end tests for Service → Router → Datasource flow
//!
//! These tests check where rows physically land, and how the node behaves
//! under concurrent writers and failing datasources.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use shardline_core::{ShardTopology, ShardingConfig};
use shardline_exec::{BackendRegistry, EngineError, ExecError, MemoryBackend, ShardOutput};
use shardline_node::{ServiceError, ShardingNode};
use shardline_router_core::LogicalStatement;
use shardline_types::{LogicalEntity, Order, OrderStatus, Row, User};
use tracing::info;

/// Initialize tracing for tests
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Create a node over in-memory datasources the test can inspect
fn create_node(datasources: u32, order_tables: u32) -> (ShardingNode, Vec<Arc<MemoryBackend>>) {
    let mut config = ShardingConfig::default();
    config.datasource_count = datasources;
    config.tables.get_mut("order").unwrap().shard_count = order_tables;

    let registry = Arc::new(BackendRegistry::new());
    let backends: Vec<_> = (0..datasources)
        .map(|i| Arc::new(MemoryBackend::new(ShardTopology::datasource_name(i))))
        .collect();
    for backend in &backends {
        registry.register(backend.clone());
    }

    (ShardingNode::with_registry(config, registry).unwrap(), backends)
}

#[tokio::test]
async fn test_orders_land_on_owner_datasource() {
    init_tracing();
    let (node, backends) = create_node(2, 2);

    let order = node
        .orders()
        .create(Order::new(3, "iPhone 15", 599_900).with_id(7))
        .await
        .unwrap();
    info!(order_id = ?order.order_id, "Order created");

    assert_eq!(backends[1].table_rows("order_1").len(), 1);
    for (ds, table) in [(0, "order_0"), (0, "order_1"), (1, "order_0")] {
        assert!(backends[ds].table_rows(table).is_empty());
    }
}

#[tokio::test]
async fn test_generated_ids_spread_across_tables() {
    init_tracing();
    let (node, backends) = create_node(2, 2);

    for _ in 0..40 {
        node.orders().create(Order::new(4, "item", 100)).await.unwrap();
    }

    let order_0 = backends[0].table_rows("order_0").len();
    let order_1 = backends[0].table_rows("order_1").len();
    info!(order_0, order_1, "Order distribution on ds0");

    assert_eq!(order_0 + order_1, 40);
    assert!(order_0 > 0 && order_1 > 0);
    assert!(backends[1].table_rows("order_0").is_empty());
    assert!(backends[1].table_rows("order_1").is_empty());
}

#[tokio::test]
async fn test_generated_ids_reach_every_shard() {
    init_tracing();
    let (node, backends) = create_node(4, 4);

    let mut user_ids = Vec::new();
    for i in 0..40 {
        let user = node.users().create(User::new(format!("user{}", i), "pw")).await.unwrap();
        user_ids.push(user.user_id.unwrap());
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    for user_id in &user_ids {
        node.orders().create(Order::new(*user_id, "item", 100)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    for (ds, backend) in backends.iter().enumerate() {
        let users = backend.table_rows("user_0").len();
        info!(ds, users, "User distribution");
        assert!(users > 0, "ds{} received no users", ds);
    }
    for table in 0..4 {
        let name = format!("order_{}", table);
        let orders: usize = backends.iter().map(|b| b.table_rows(&name).len()).sum();
        info!(table = %name, orders, "Order distribution");
        assert!(orders > 0, "{} received no orders", name);
    }
}

#[tokio::test]
async fn test_every_row_on_its_computed_shard() {
    init_tracing();
    let (node, backends) = create_node(3, 4);

    for user_id in 0..12 {
        let user = node.users().create(User::new(format!("u{}", user_id), "pw").with_id(user_id)).await.unwrap();
        for _ in 0..3 {
            node.orders().create(Order::new(user.user_id.unwrap(), "item", 1)).await.unwrap();
        }
    }

    for (ds, backend) in backends.iter().enumerate() {
        for row in backend.table_rows("user_0") {
            assert_eq!(row.get_int("user_id").unwrap() % 3, ds as i64);
        }
        for table in 0..4 {
            for row in backend.table_rows(&format!("order_{}", table)) {
                assert_eq!(row.get_int("user_id").unwrap() % 3, ds as i64);
                assert_eq!(row.get_int("order_id").unwrap() % 4, table);
            }
        }
    }
    assert_eq!(node.orders().count().await.unwrap(), 36);
}

#[tokio::test]
async fn test_concurrent_creates_get_unique_ids() {
    init_tracing();
    let (node, _) = create_node(2, 2);
    let node = Arc::new(node);

    let tasks: Vec<_> = (0..10)
        .map(|worker| {
            let node = node.clone();
            tokio::spawn(async move {
                let mut ids = Vec::new();
                for i in 0..100 {
                    let order = node
                        .orders()
                        .create(Order::new(worker, format!("item-{}", i), 100))
                        .await
                        .unwrap();
                    ids.push(order.order_id.unwrap());
                }
                ids
            })
        })
        .collect();

    let mut unique = HashSet::new();
    for ids in futures::future::join_all(tasks).await {
        for id in ids.unwrap() {
            assert!(unique.insert(id), "duplicate order id {}", id);
        }
    }

    assert_eq!(unique.len(), 1000);
    assert_eq!(node.orders().count().await.unwrap(), 1000);
}

#[tokio::test]
async fn test_broadcast_with_failed_datasource() {
    init_tracing();
    let (node, backends) = create_node(4, 1);
    for user_id in 0..8 {
        node.users().create(User::new(format!("u{}", user_id), "pw").with_id(user_id)).await.unwrap();
    }

    backends[2].set_available(false);

    // Point reads on healthy datasources keep working
    assert!(node.users().get_by_id(1).await.unwrap().is_some());

    let err = node.users().get_all().await.unwrap_err();
    match err {
        ServiceError::Engine(EngineError::Exec(ExecError::PartialShardFailure { failures, completed })) => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].position, 2);
            assert_eq!(failures[0].target.datasource, "ds2");
            let rows: usize = completed.iter().map(|r| r.output.rows().len()).sum();
            assert_eq!(rows, 6);
        }
        other => panic!("unexpected error: {other}"),
    }

    backends[2].set_available(true);
    assert_eq!(node.users().get_all().await.unwrap().len(), 8);
}

#[tokio::test]
async fn test_statement_plans() {
    init_tracing();
    let (node, _) = create_node(2, 2);
    let engine = node.engine();

    let mut insert = LogicalStatement::insert(
        LogicalEntity::Order,
        Row::new().with("user_id", 3).with("order_id", 7),
    );
    let (targets, physical) = engine.plan(&mut insert).unwrap();
    assert_eq!(targets.len(), 1);
    assert_eq!(physical[0].target.to_string(), "ds1/order_1");
    assert_eq!(physical[0].sql, "INSERT INTO `order_1` (order_id, user_id) VALUES (?, ?)");

    let mut by_user = LogicalStatement::select_by_foreign_key(LogicalEntity::Order, "user_id", 4);
    let (_, physical) = engine.plan(&mut by_user).unwrap();
    let placed: Vec<String> = physical.iter().map(|p| p.target.to_string()).collect();
    assert_eq!(placed, vec!["ds0/order_0", "ds0/order_1"]);

    let mut all = LogicalStatement::select_all(LogicalEntity::Order);
    assert_eq!(engine.plan(&mut all).unwrap().1.len(), 4);
}

#[tokio::test]
async fn test_fan_out_writes_with_failed_datasource() {
    init_tracing();
    let (node, backends) = create_node(2, 2);
    for order_id in [7, 9] {
        node.orders()
            .create(Order::new(3, "iPhone 15", 599_900).with_id(order_id))
            .await
            .unwrap();
    }
    assert_eq!(backends[1].table_rows("order_1").len(), 2);

    // Without the owner key both writes go to order_1 on every datasource
    backends[0].set_available(false);

    let err = node.orders().delete(7).await.unwrap_err();
    match err {
        ServiceError::Engine(EngineError::Exec(ExecError::PartialShardFailure { failures, completed })) => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].position, 0);
            assert_eq!(failures[0].target.datasource, "ds0");
            assert_eq!(completed.len(), 1);
            assert_eq!(completed[0].target.to_string(), "ds1/order_1");
            assert_eq!(completed[0].output, ShardOutput::Affected(1));
        }
        other => panic!("unexpected error: {other}"),
    }
    let remaining = backends[1].table_rows("order_1");
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].get_int("order_id"), Some(9));

    let err = node.orders().update_status(9, OrderStatus::Paid).await.unwrap_err();
    match err {
        ServiceError::Engine(EngineError::Exec(ExecError::PartialShardFailure { failures, completed })) => {
            assert_eq!(failures[0].target.datasource, "ds0");
            assert_eq!(completed[0].output, ShardOutput::Affected(1));
        }
        other => panic!("unexpected error: {other}"),
    }

    backends[0].set_available(true);
    let paid = node.orders().get_by_id(9).await.unwrap().unwrap();
    assert_eq!(paid.status, Some(OrderStatus::Paid));
}
