//! Per-flow session state.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use vouch_common::{Identity, Phase, Rating};

use super::code_input::CodeInput;
use super::cooldown::Cooldown;

/// Free-form content fields collected in the `Content` phase.
///
/// Only `content` is hard-required; everything else is optional and the
/// rating falls back to its default when the selector was never touched.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentFields {
    pub content: String,
    pub rating: Option<u8>,
    pub role: Option<String>,
    pub company: Option<String>,
    pub phone: Option<String>,
}

/// The complete, ephemeral state of one in-progress flow.
///
/// Created on flow start, destroyed on cancel or success. Nothing in here
/// survives teardown; dropping the session aborts its cooldown task.
#[derive(Debug)]
pub struct Session {
    pub phase: Phase,
    pub identity: Option<Identity>,
    pub code: CodeInput,
    pub cooldown: Cooldown,

    /// Content payload, preserved across failed create attempts
    pub payload: Option<ContentFields>,

    /// At most one remote call per session may be pending
    pub in_flight: bool,

    /// Bumped by the go-back escape hatch so a remote result issued before
    /// it resolves against stale state is discarded, never applied
    pub epoch: u64,

    /// Last user interaction, for idle sweeping
    pub last_active: Instant,
}

impl Session {
    pub fn new() -> Self {
        Self {
            phase: Phase::Identity,
            identity: None,
            code: CodeInput::new(),
            cooldown: Cooldown::new(),
            payload: None,
            in_flight: false,
            epoch: 0,
            last_active: Instant::now(),
        }
    }

    pub fn touch(&mut self) {
        self.last_active = Instant::now();
    }

    /// Snapshot for the status endpoint
    pub fn status(&self) -> FlowStatus {
        FlowStatus {
            phase: self.phase,
            cooldown_secs: self.cooldown.remaining(),
            resend_ready: self.phase == Phase::Verifying && self.cooldown.is_ready(),
            code_filled: self.code.filled(),
            code_focus: self.code.focus(),
            code_submittable: self.code.is_submittable(),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Client-visible view of a session
#[derive(Debug, Clone, Serialize)]
pub struct FlowStatus {
    pub phase: Phase,
    pub cooldown_secs: u32,
    pub resend_ready: bool,
    pub code_filled: usize,
    pub code_focus: usize,
    pub code_submittable: bool,
}

/// Default rating applied when the selector is never touched.
///
/// Carried over from the product as-is (biases toward the happy path);
/// flagged in DESIGN.md as a product decision, not a bug.
pub fn rating_or_default(rating: Option<u8>) -> Rating {
    rating.map(Rating::new).unwrap_or_default()
}
