//! Shardline Node - Sharded CRUD node
//!
//! The node is responsible for:
//! - Loading the sharding configuration
//! - Registering one backend per datasource
//! - Validating the topology against those backends
//! - Exposing the user and order services

pub mod error;
pub mod order_service;
pub mod user_service;

pub use error::{ServiceError, ServiceResult};
pub use order_service::OrderService;
pub use user_service::UserService;

use shardline_core::{ShardTopology, ShardingConfig};
use shardline_exec::{BackendRegistry, MemoryBackend, ShardingEngine};
use std::sync::Arc;
use tracing::info;

/// Sharded CRUD node
pub struct ShardingNode {
    config: ShardingConfig,
    registry: Arc<BackendRegistry>,
    engine: Arc<ShardingEngine>,
    users: UserService,
    orders: OrderService,
}

impl ShardingNode {
    /// Create a node backed by one in-memory datasource per `ds{i}`
    pub fn new(config: ShardingConfig) -> ServiceResult<Self> {
        let registry = Arc::new(BackendRegistry::new());
        for i in 0..config.datasource_count {
            registry.register(Arc::new(MemoryBackend::from_config(
                ShardTopology::datasource_name(i),
                &config.execution,
            )));
        }
        Self::with_registry(config, registry)
    }

    /// Create a node over externally registered backends
    pub fn with_registry(config: ShardingConfig, registry: Arc<BackendRegistry>) -> ServiceResult<Self> {
        info!(
            datasources = config.datasource_count,
            worker_id = config.id.worker_id,
            "Creating sharding node"
        );

        let engine = Arc::new(ShardingEngine::from_config(&config, registry.clone())?);

        Ok(Self {
            users: UserService::new(engine.clone()),
            orders: OrderService::new(engine.clone()),
            config,
            registry,
            engine,
        })
    }

    /// Load configuration from the environment and create the node
    pub fn from_env() -> ServiceResult<Self> {
        Self::new(ShardingConfig::from_env()?)
    }

    pub fn config(&self) -> &ShardingConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<BackendRegistry> {
        &self.registry
    }

    pub fn engine(&self) -> &Arc<ShardingEngine> {
        &self.engine
    }

    pub fn users(&self) -> &UserService {
        &self.users
    }

    pub fn orders(&self) -> &OrderService {
        &self.orders
    }
}
