//! Verified testimonial persistence against Redis.

use async_trait::async_trait;
use redis::AsyncCommands;

use vouch_common::constants::redis_keys::{TESTIMONIAL_INDEX, TESTIMONIAL_PREFIX};
use vouch_common::{Testimonial, TestimonialDraft, VouchError};

/// Contract the flow engine requires from the Submission Store:
/// persist the finished record and return its canonical stored form,
/// including the server-assigned identifier.
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    async fn create(&self, draft: TestimonialDraft) -> Result<Testimonial, VouchError>;
}

/// Redis-backed Submission Store
pub struct RedisSubmissionStore {
    redis: redis::aio::ConnectionManager,
}

impl RedisSubmissionStore {
    pub fn new(redis: redis::aio::ConnectionManager) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl SubmissionStore for RedisSubmissionStore {
    async fn create(&self, draft: TestimonialDraft) -> Result<Testimonial, VouchError> {
        let id = generate_record_id();
        let record = Testimonial::from_draft(id.clone(), draft);

        let data = serde_json::to_string(&record)
            .map_err(|e| VouchError::Internal(e.to_string()))?;

        let key = format!("{}{}", TESTIMONIAL_PREFIX, id);
        let mut conn = self.redis.clone();
        conn.set::<_, _, ()>(&key, data)
            .await
            .map_err(|e| VouchError::Redis(e.to_string()))?;
        conn.rpush::<_, _, ()>(TESTIMONIAL_INDEX, &id)
            .await
            .map_err(|e| VouchError::Redis(e.to_string()))?;

        tracing::info!(id = %id, rating = record.rating.value(), "Testimonial stored");

        Ok(record)
    }
}

/// Generate a cryptographically random record identifier
fn generate_record_id() -> String {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use rand::Rng;

    let mut bytes = [0u8; 16];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
