//! Application state and shared resources.

use anyhow::{Context, Result};
use redis::aio::ConnectionManager;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::flow::FlowEngine;
use crate::stores::{RedisCodeStore, RedisSubmissionStore, TracingDelivery};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,

    /// Redis connection manager (auto-reconnecting)
    pub redis: ConnectionManager,

    /// The verified-submission flow engine
    pub engine: Arc<FlowEngine>,
}

impl AppState {
    /// Create new application state, connecting to Redis
    pub async fn new(config: AppConfig) -> Result<Self> {
        // Connect to Redis with connection manager (handles reconnection)
        let client = redis::Client::open(config.redis_url.as_str())
            .context("Failed to create Redis client")?;

        let redis = ConnectionManager::new(client)
            .await
            .context("Failed to connect to Redis")?;

        let code_store = Arc::new(RedisCodeStore::new(
            redis.clone(),
            Arc::new(TracingDelivery),
            config.code.code_ttl_secs,
        ));
        let submission_store = Arc::new(RedisSubmissionStore::new(redis.clone()));

        let engine = Arc::new(FlowEngine::new(
            code_store,
            submission_store,
            config.code.resend_cooldown_secs,
        ));

        Ok(Self {
            config,
            redis,
            engine,
        })
    }
}
