//! # Stillwater Common
//!
//! Shared types, traits, and utilities used across Stillwater components.
//!
//! ## Modules
//! - `types` - Wire types (challenge prompts, request bodies, threat assessment)
//! - `error` - Error taxonomy with HTTP status mapping
//! - `constants` - Default limits, TTLs, and header names

pub mod constants;
pub mod error;
pub mod types;

pub use error::{ChallengeError, StillwaterError};
pub use types::*;
