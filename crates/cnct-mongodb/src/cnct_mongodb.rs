//! Typed CRUD helpers over a single MongoDB collection
//!
//! This crate wraps one `mongodb::Collection` in a [`MongoCollection`] handle
//! and exposes one method per CRUD verb. Callers hand in filter and update
//! documents and name the Rust type they want back; the handle encodes and
//! decodes through BSON.
//!
//! # Features
//!
//! - Explicit construction with a typed connection error
//! - A fresh deadline for every call, never shared between calls
//! - Generic decode into any `serde::Deserialize` type
//! - An update builder and up-front update validation
//! - JSON filter parsing
//!
//! # Example
//!
//! ```ignore
//! use bson::doc;
//! use cnct_core::CollectionConfig;
//! use cnct_mongodb::{MongoCollection, Update};
//!
//! let config = CollectionConfig::new("mongodb://localhost:27017", "exampleDB", "users");
//! let users = MongoCollection::connect(&config).await?;
//!
//! let bob: User = users.find_one(doc! { "name": "bob" }).await?;
//! let outcome = users
//!     .update_one(doc! { "name": "bob" }, Update::new().set("surname", "lee"))
//!     .await?;
//! assert_eq!((outcome.matched, outcome.modified), (1, 1));
//! ```

pub mod codec;
mod collection;
#[cfg(test)]
mod collection_tests;
mod deadline;
#[cfg(test)]
mod deadline_tests;
mod filter;
mod update;
#[cfg(test)]
mod update_tests;

pub use collection::*;
pub use deadline::*;
pub use filter::*;
pub use update::*;

pub use bson::{Bson, Document, doc};
pub use cnct_core::{CnctError, CollectionConfig, Result, UpdateOutcome};
