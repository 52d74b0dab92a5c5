//! Configuration management for Usher.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use vouch_common::constants::{
    CODE_TTL_SECS, DEFAULT_LISTEN_ADDR, DEFAULT_REDIS_URL, RESEND_COOLDOWN_SECS,
    SESSION_IDLE_TTL_SECS, SESSION_SWEEP_INTERVAL_SECS,
};

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Redis connection URL
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// HTTP listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// One-time code configuration
    #[serde(default)]
    pub code: CodeConfig,

    /// Session housekeeping configuration
    #[serde(default)]
    pub session: SessionConfig,
}

/// One-time code configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CodeConfig {
    /// Code validity in seconds
    #[serde(default = "default_code_ttl")]
    pub code_ttl_secs: u64,

    /// Seconds before a code can be re-dispatched
    #[serde(default = "default_resend_cooldown")]
    pub resend_cooldown_secs: u32,
}

impl Default for CodeConfig {
    fn default() -> Self {
        Self {
            code_ttl_secs: default_code_ttl(),
            resend_cooldown_secs: default_resend_cooldown(),
        }
    }
}

/// Session housekeeping configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Idle threshold before an abandoned flow is evicted
    #[serde(default = "default_idle_ttl")]
    pub idle_ttl_secs: u64,

    /// Reaper sweep interval in seconds
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_ttl_secs: default_idle_ttl(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

// Default value functions
fn default_redis_url() -> String { DEFAULT_REDIS_URL.to_string() }
fn default_listen_addr() -> String { DEFAULT_LISTEN_ADDR.to_string() }
fn default_code_ttl() -> u64 { CODE_TTL_SECS }
fn default_resend_cooldown() -> u32 { RESEND_COOLDOWN_SECS }
fn default_idle_ttl() -> u64 { SESSION_IDLE_TTL_SECS }
fn default_sweep_interval() -> u64 { SESSION_SWEEP_INTERVAL_SECS }

impl AppConfig {
    /// Load configuration from file, with CLI overrides
    pub fn load(config_path: &str, args: &super::Args) -> Result<Self> {
        let mut config = if Path::new(config_path).exists() {
            let settings = config::Config::builder()
                .add_source(config::File::with_name(config_path))
                .build()
                .context("Failed to load config file")?;

            settings
                .try_deserialize()
                .context("Failed to parse config")?
        } else {
            // Use defaults if config file doesn't exist
            tracing::warn!("Config file not found, using defaults");
            Self::default()
        };

        // Apply CLI overrides
        if let Some(ref redis_url) = args.redis_url {
            config.redis_url = redis_url.clone();
        }
        if let Some(ref listen) = args.listen {
            config.listen_addr = listen.clone();
        }

        Ok(config)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            redis_url: default_redis_url(),
            listen_addr: default_listen_addr(),
            code: CodeConfig::default(),
            session: SessionConfig::default(),
        }
    }
}
