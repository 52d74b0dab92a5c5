//! The verified-submission flow.
//!
//! Three phases gate a testimonial behind proof of control over an email
//! address: identity capture, code verification, content submission.
//! `FlowEngine` owns the sessions and drives the two external stores;
//! `CodeInput` and `Cooldown` are its sub-components.

mod code_input;
mod cooldown;
mod engine;
mod session;

pub use code_input::CodeInput;
pub use cooldown::Cooldown;
pub use engine::{session_reaper, FlowEngine};
pub use session::{ContentFields, FlowStatus, Session};
