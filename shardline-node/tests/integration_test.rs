//! Integration tests for the user and order services

use shardline_core::ShardingConfig;
use shardline_node::{ServiceError, ShardingNode};
use shardline_types::{Order, OrderStatus, User, UserStatus};

fn create_node() -> ShardingNode {
    ShardingNode::new(ShardingConfig::default()).unwrap()
}

#[tokio::test]
async fn test_create_user_fills_defaults() {
    let node = create_node();

    let user = node
        .users()
        .create(User::new("testuser", "password123").with_email("test@example.com"))
        .await
        .unwrap();

    assert!(user.user_id.is_some());
    assert_eq!(user.status, Some(UserStatus::Enabled));
    assert!(user.create_time.is_some());
    assert_eq!(user.create_time, user.update_time);

    let stored = node.users().get_by_id(user.user_id.unwrap()).await.unwrap().unwrap();
    assert_eq!(stored, user);
}

#[tokio::test]
async fn test_user_lookups() {
    let node = create_node();
    for name in ["alice", "bob", "carol"] {
        node.users().create(User::new(name, "pw")).await.unwrap();
    }

    let bob = node.users().get_by_username("bob").await.unwrap().unwrap();
    assert_eq!(bob.username, "bob");
    assert!(node.users().get_by_username("mallory").await.unwrap().is_none());
    assert!(node.users().get_by_id(424242).await.unwrap().is_none());

    assert_eq!(node.users().get_all().await.unwrap().len(), 3);
    assert_eq!(node.users().count().await.unwrap(), 3);
}

#[tokio::test]
async fn test_update_and_delete_user() {
    let node = create_node();
    let mut user = node.users().create(User::new("dave", "old")).await.unwrap();

    user.password = "new".to_string();
    user.phone = Some("555-0100".to_string());
    let updated = node.users().update(user.clone()).await.unwrap();
    assert_eq!(updated.password, "new");
    assert_eq!(updated.phone.as_deref(), Some("555-0100"));
    assert!(updated.update_time >= user.update_time);

    let user_id = user.user_id.unwrap();
    assert!(node.users().delete(user_id).await.unwrap());
    assert!(!node.users().delete(user_id).await.unwrap());

    let missing = node.users().update(user).await;
    assert!(matches!(missing, Err(ServiceError::NotFound { entity: "user", .. })));
}

#[tokio::test]
async fn test_user_pages() {
    let node = create_node();
    for i in 0..7 {
        node.users().create(User::new(format!("user{}", i), "pw")).await.unwrap();
    }

    let all = node.users().get_all().await.unwrap();
    let first = node.users().get_page(1, 3).await.unwrap();
    let third = node.users().get_page(3, 3).await.unwrap();

    assert_eq!(first, all[0..3].to_vec());
    assert_eq!(third, all[6..7].to_vec());
    assert!(node.users().get_page(4, 3).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_order_fills_defaults() {
    let node = create_node();

    let order = node
        .orders()
        .create(Order::new(1, "iPhone 15", 599_900).with_quantity(1))
        .await
        .unwrap();

    assert_eq!(order.user_id, Some(1));
    assert_eq!(order.status, Some(OrderStatus::Pending));
    assert!(order.create_time.is_some());
    assert!(order.order_no.as_deref().unwrap().starts_with("ORDER"));

    let stored = node.orders().get_by_id(order.order_id.unwrap()).await.unwrap().unwrap();
    assert_eq!(stored, order);
}

#[tokio::test]
async fn test_create_order_keeps_custom_order_no() {
    let node = create_node();

    let mut order = Order::new(1, "iPad", 399_900);
    order.order_no = Some("CUSTOM_ORDER_001".to_string());
    let created = node.orders().create(order).await.unwrap();
    assert_eq!(created.order_no.as_deref(), Some("CUSTOM_ORDER_001"));

    let found = node.orders().get_by_order_no("CUSTOM_ORDER_001").await.unwrap().unwrap();
    assert_eq!(found.order_id, created.order_id);
    assert!(node.orders().get_by_order_no("ORDER-NOPE").await.unwrap().is_none());
}

#[tokio::test]
async fn test_orders_of_user() {
    let node = create_node();
    for (user_id, product) in [(1, "iPhone 15"), (1, "AirPods"), (1, "MacBook"), (2, "iPad")] {
        node.orders().create(Order::new(user_id, product, 100)).await.unwrap();
    }

    let mine = node.orders().get_by_user_id(1).await.unwrap();
    assert_eq!(mine.len(), 3);
    assert!(mine.iter().all(|o| o.user_id == Some(1)));

    assert_eq!(node.orders().count_by_user_id(1).await.unwrap(), 3);
    assert_eq!(node.orders().count().await.unwrap(), 4);

    let page = node.orders().get_page_by_user_id(1, 2, 2).await.unwrap();
    assert_eq!(page, mine[2..3].to_vec());
}

#[tokio::test]
async fn test_update_order_and_status() {
    let node = create_node();
    let mut order = node.orders().create(Order::new(3, "iPhone 15", 599_900)).await.unwrap();
    let order_id = order.order_id.unwrap();

    order.product_name = "iPhone 15 Pro".to_string();
    let updated = node.orders().update(order).await.unwrap();
    assert_eq!(updated.product_name, "iPhone 15 Pro");

    assert!(node.orders().update_status(order_id, OrderStatus::Shipped).await.unwrap());
    let shipped = node.orders().get_by_id(order_id).await.unwrap().unwrap();
    assert_eq!(shipped.status, Some(OrderStatus::Shipped));

    assert!(!node.orders().update_status(999, OrderStatus::Paid).await.unwrap());
}

#[tokio::test]
async fn test_delete_order() {
    let node = create_node();
    let order = node.orders().create(Order::new(5, "Kindle", 99_900)).await.unwrap();
    let order_id = order.order_id.unwrap();

    assert!(node.orders().delete(order_id).await.unwrap());
    assert!(!node.orders().delete(order_id).await.unwrap());
    assert!(node.orders().get_by_id(order_id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_order_pages_span_shards() {
    let node = create_node();
    for user_id in 0..6 {
        node.orders().create(Order::new(user_id, "item", 100)).await.unwrap();
    }

    let all = node.orders().get_all().await.unwrap();
    assert_eq!(all.len(), 6);

    let second = node.orders().get_page(2, 4).await.unwrap();
    assert_eq!(second, all[4..6].to_vec());
}
