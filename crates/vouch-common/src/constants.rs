//! Shared constants for Vouch components.

/// Default Redis connection URL
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

/// Default Usher HTTP listen address
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8787";

/// Number of cells in a one-time code
pub const CODE_LENGTH: usize = 6;

/// Seconds a user must wait before a code can be re-dispatched
pub const RESEND_COOLDOWN_SECS: u32 = 60;

/// Cooldown tick interval in seconds
pub const COOLDOWN_TICK_SECS: u64 = 1;

/// One-time code expiry in Redis (5 minutes)
pub const CODE_TTL_SECS: u64 = 300;

/// Idle session eviction threshold (30 minutes)
pub const SESSION_IDLE_TTL_SECS: u64 = 1800;

/// How often the session reaper sweeps (seconds)
pub const SESSION_SWEEP_INTERVAL_SECS: u64 = 60;

/// Redis key prefixes
pub mod redis_keys {
    /// Pending one-time code: otp:{email}
    pub const OTP_PREFIX: &str = "otp:";

    /// Stored testimonial: testimonial:{id}
    pub const TESTIMONIAL_PREFIX: &str = "testimonial:";

    /// Ordered list of testimonial ids
    pub const TESTIMONIAL_INDEX: &str = "testimonials:index";
}
