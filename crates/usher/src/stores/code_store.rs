//! One-time code issuance and verification against Redis.

use std::sync::Arc;

use async_trait::async_trait;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};

use vouch_common::constants::redis_keys::OTP_PREFIX;
use vouch_common::constants::CODE_LENGTH;
use vouch_common::VouchError;

use super::delivery::CodeDelivery;

/// Contract the flow engine requires from the Code Store.
///
/// `dispatch` must be safely re-callable: each call issues a fresh code
/// that supersedes any prior code for that email. `verify` consumes the
/// code on success (single-use) and leaves it in place on mismatch so a
/// mistyped entry can be corrected without a resend.
#[async_trait]
pub trait CodeStore: Send + Sync {
    async fn dispatch(&self, name: &str, email: &str) -> Result<(), VouchError>;
    async fn verify(&self, email: &str, code: &str) -> Result<(), VouchError>;
}

/// Stored code data in Redis
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredCode {
    /// The expected digits
    code: String,
    /// Name captured at dispatch time
    name: String,
    /// Creation timestamp
    created_at: i64,
    /// Expiry timestamp
    expires_at: i64,
}

/// Redis-backed Code Store
pub struct RedisCodeStore {
    redis: redis::aio::ConnectionManager,
    delivery: Arc<dyn CodeDelivery>,
    /// Code TTL in seconds
    code_ttl: u64,
}

impl RedisCodeStore {
    pub fn new(
        redis: redis::aio::ConnectionManager,
        delivery: Arc<dyn CodeDelivery>,
        code_ttl: u64,
    ) -> Self {
        Self {
            redis,
            delivery,
            code_ttl,
        }
    }
}

#[async_trait]
impl CodeStore for RedisCodeStore {
    async fn dispatch(&self, name: &str, email: &str) -> Result<(), VouchError> {
        let code = generate_code();
        let now = chrono::Utc::now().timestamp();

        let stored = StoredCode {
            code: code.clone(),
            name: name.to_string(),
            created_at: now,
            expires_at: now + self.code_ttl as i64,
        };
        let data = serde_json::to_string(&stored)
            .map_err(|e| VouchError::Internal(e.to_string()))?;

        // SET overwrites: a re-dispatch supersedes the previous code
        let key = format!("{}{}", OTP_PREFIX, email);
        let mut conn = self.redis.clone();
        conn.set_ex::<_, _, ()>(&key, data, self.code_ttl)
            .await
            .map_err(|e| VouchError::Redis(e.to_string()))?;

        self.delivery.deliver(name, email, &code).await?;

        tracing::debug!(email = %email, ttl = self.code_ttl, "Code dispatched");

        Ok(())
    }

    async fn verify(&self, email: &str, code: &str) -> Result<(), VouchError> {
        let key = format!("{}{}", OTP_PREFIX, email);
        let mut conn = self.redis.clone();

        let stored: Option<String> = conn
            .get(&key)
            .await
            .map_err(|e| VouchError::Redis(e.to_string()))?;

        let stored = match stored {
            Some(s) => s,
            None => return Err(VouchError::CodeExpired),
        };

        let stored: StoredCode = serde_json::from_str(&stored)
            .map_err(|e| VouchError::Internal(e.to_string()))?;

        let now = chrono::Utc::now().timestamp();
        if now > stored.expires_at {
            let _: () = conn
                .del(&key)
                .await
                .map_err(|e| VouchError::Redis(e.to_string()))?;
            return Err(VouchError::CodeExpired);
        }

        if stored.code != code {
            tracing::debug!(email = %email, "Code mismatch");
            return Err(VouchError::CodeMismatch);
        }

        // Single-use: consume the code on success to prevent replay
        let _: () = conn
            .del(&key)
            .await
            .map_err(|e| VouchError::Redis(e.to_string()))?;

        tracing::info!(email = %email, "Code verified");

        Ok(())
    }
}

/// Generate a fresh numeric code of `CODE_LENGTH` digits
fn generate_code() -> String {
    use rand::Rng;

    let max = 10u32.pow(CODE_LENGTH as u32);
    let n = rand::rng().random_range(0..max);
    format!("{:0width$}", n, width = CODE_LENGTH)
}
