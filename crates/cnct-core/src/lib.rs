//! cnct core - shared abstractions for the collection helpers
//!
//! This crate defines the pieces every driver crate builds on:
//!
//! - `CnctError` - the error taxonomy, with `Result` as the alias
//! - `CollectionConfig` - where a handle connects and its per-call timeout
//! - `UpdateOutcome` - matched/modified counts from updates

mod config;
mod error;
mod types;

pub use config::*;
pub use error::*;
pub use types::*;
