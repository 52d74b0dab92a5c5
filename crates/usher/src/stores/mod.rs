//! External store adapters.
//!
//! The flow engine never talks to Redis or a mail transport directly; it
//! consumes the `CodeStore` and `SubmissionStore` contracts. The Redis
//! implementations here are the shipped adapters, and tests substitute
//! mocks behind the same traits.

mod code_store;
mod delivery;
mod submission_store;

pub use code_store::{CodeStore, RedisCodeStore};
pub use delivery::{CodeDelivery, TracingDelivery};
pub use submission_store::{RedisSubmissionStore, SubmissionStore};
