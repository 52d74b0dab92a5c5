//! # Vouch Common
//!
//! Shared types, traits, and utilities used across Vouch components.
//!
//! ## Modules
//! - `types` - Core data structures (Phase, Rating, Testimonial, etc.)
//! - `error` - Common error types
//! - `constants` - Shared configuration constants

pub mod constants;
pub mod error;
pub mod types;

pub use error::VouchError;
pub use types::*;
