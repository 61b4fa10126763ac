//! Filter parsing
//!
//! Filters are ordinary BSON documents, normally built with `bson::doc!`.
//! [`parse_filter`] accepts the same thing as JSON text, which is handy for
//! filters that arrive from configuration or the command line.

use bson::Document;
use cnct_core::{CnctError, Result};

/// Parse a JSON object into a filter document
///
/// Blank input is the match-all filter `{}`. Extended JSON such as
/// `{"_id": {"$oid": "..."}}` is understood.
pub fn parse_filter(text: &str) -> Result<Document> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(Document::new());
    }

    if !trimmed.starts_with('{') {
        return Err(CnctError::InvalidFilter(format!(
            "filter must be a JSON object, found {:?}",
            trimmed.chars().next().unwrap_or_default()
        )));
    }

    serde_json::from_str::<Document>(trimmed)
        .map_err(|e| CnctError::InvalidFilter(format!("Invalid JSON document: {}", e)))
}
