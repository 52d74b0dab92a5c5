//! Out-of-band code delivery seam.

use async_trait::async_trait;

use vouch_common::VouchError;

/// Hands a freshly dispatched code to whatever actually reaches the user.
///
/// Mail/SMS transport is an external concern; implementations plug in at
/// this seam. The Code Store only guarantees the code was handed off.
#[async_trait]
pub trait CodeDelivery: Send + Sync {
    async fn deliver(&self, name: &str, email: &str, code: &str) -> Result<(), VouchError>;
}

/// Development delivery: writes the code to the log instead of sending it.
pub struct TracingDelivery;

#[async_trait]
impl CodeDelivery for TracingDelivery {
    async fn deliver(&self, name: &str, email: &str, code: &str) -> Result<(), VouchError> {
        tracing::info!(
            name = %name,
            email = %email,
            code = %code,
            "Code delivery (dev mode, not actually sent)"
        );
        Ok(())
    }
}
