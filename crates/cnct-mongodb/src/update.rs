//! Update documents
//!
//! An update is a document whose top-level keys are all update operators,
//! e.g. `{ "$set": { "surname": "lee" } }`. [`Update`] builds one field at
//! a time and groups fields under their operator in first-use order.

use bson::{Bson, Document};
use cnct_core::{CnctError, Result};

/// Builder for an operator-based update document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    operators: Document,
}

impl Update {
    /// Create an empty update
    pub fn new() -> Self {
        Self::default()
    }

    /// `$set`: assign `value` to `field`
    pub fn set(self, field: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.push_operand("$set", field.into(), value.into())
    }

    /// `$unset`: remove `field`
    pub fn unset(self, field: impl Into<String>) -> Self {
        self.push_operand("$unset", field.into(), Bson::String(String::new()))
    }

    /// `$inc`: add `amount` to a numeric `field`
    pub fn inc(self, field: impl Into<String>, amount: impl Into<Bson>) -> Self {
        self.push_operand("$inc", field.into(), amount.into())
    }

    /// `$push`: append `value` to an array `field`
    pub fn push(self, field: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.push_operand("$push", field.into(), value.into())
    }

    /// `$rename`: move `field` to `to`
    pub fn rename(self, field: impl Into<String>, to: impl Into<String>) -> Self {
        self.push_operand("$rename", field.into(), Bson::String(to.into()))
    }

    /// True when no operator has been added
    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    pub fn as_document(&self) -> &Document {
        &self.operators
    }

    pub fn into_document(self) -> Document {
        self.operators
    }

    fn push_operand(mut self, operator: &str, field: String, value: Bson) -> Self {
        if !self.operators.contains_key(operator) {
            self.operators.insert(operator, Document::new());
        }
        if let Ok(fields) = self.operators.get_document_mut(operator) {
            fields.insert(field, value);
        }
        self
    }
}

impl From<Update> for Document {
    fn from(update: Update) -> Self {
        update.into_document()
    }
}

/// Check that `update` only contains update operators
///
/// The document must be non-empty, every top-level key must start with `$`,
/// and every operator must map to a non-empty document of fields.
pub fn validate_update(update: &Document) -> Result<()> {
    if update.is_empty() {
        return Err(CnctError::InvalidUpdate(
            "update document must not be empty".to_string(),
        ));
    }

    for (key, value) in update {
        if !key.starts_with('$') {
            return Err(CnctError::InvalidUpdate(format!(
                "update keys must be operators such as $set, found {:?}",
                key
            )));
        }
        match value {
            Bson::Document(fields) if fields.is_empty() => {
                return Err(CnctError::InvalidUpdate(format!(
                    "operator {} has no fields",
                    key
                )));
            }
            Bson::Document(_) => {}
            other => {
                return Err(CnctError::InvalidUpdate(format!(
                    "operator {} expects a document, found {:?}",
                    key,
                    other.element_type()
                )));
            }
        }
    }

    Ok(())
}
