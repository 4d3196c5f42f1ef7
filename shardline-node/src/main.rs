//! Shardline Node - Main entry point
//!
//! Loads the configuration from the environment, builds a node over
//! in-memory datasources and walks through the user and order services.

use anyhow::Context;
use shardline_node::ShardingNode;
use shardline_types::{Order, OrderStatus, User};
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Load configuration from environment
    let node = ShardingNode::from_env().context("failed to start sharding node")?;
    info!(
        datasources = node.config().datasource_count,
        backends = ?node.registry().names(),
        "Sharding node started"
    );

    let users = node.users();
    let orders = node.orders();

    let mut created = Vec::new();
    for name in ["alice", "bob", "carol", "dave"] {
        let user = users
            .create(User::new(name, "changeme").with_email(format!("{}@example.com", name)))
            .await?;
        created.push(user);
    }

    for user in &created {
        let user_id = user.user_id.context("created user has no id")?;
        for (product, amount_cents) in [("iPhone 15", 599_900), ("AirPods", 129_900)] {
            orders.create(Order::new(user_id, product, amount_cents)).await?;
        }
    }

    let first_user = created
        .first()
        .and_then(|u| u.user_id)
        .context("no user created")?;
    let mine = orders.get_by_user_id(first_user).await?;
    if let Some(order_id) = mine.first().and_then(|o| o.order_id) {
        orders.update_status(order_id, OrderStatus::Paid).await?;
    }

    let page = orders.get_page(1, 5).await?;
    let user_count = users.count().await?;
    let order_count = orders.count().await?;
    let first_user_orders = orders.count_by_user_id(first_user).await?;
    info!(
        users = user_count,
        orders = order_count,
        orders_of_first_user = first_user_orders,
        first_page = page.len(),
        "Demo completed"
    );

    Ok(())
}
