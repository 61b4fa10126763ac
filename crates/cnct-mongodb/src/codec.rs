//! BSON translation between caller types and documents
//!
//! The handle stores and fetches plain `bson::Document`s. These helpers turn
//! caller values into documents before a write and documents into the
//! caller's declared type after a read.

use bson::Document;
use cnct_core::{CnctError, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Serialize `value` into a BSON document
///
/// Values that serialize to something other than a document (a bare string,
/// a number, a sequence) are rejected.
pub fn encode<T>(value: &T) -> Result<Document>
where
    T: Serialize + ?Sized,
{
    bson::to_document(value).map_err(|e| CnctError::Encode(e.to_string()))
}

/// Deserialize a BSON document into `T`
pub fn decode<T>(document: Document) -> Result<T>
where
    T: DeserializeOwned,
{
    bson::from_document(document).map_err(|e| CnctError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::{Bson, doc, oid::ObjectId};
    use pretty_assertions::assert_eq;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Person {
        name: String,
        surname: String,
    }

    #[derive(Debug, PartialEq, Deserialize)]
    struct Stored {
        #[serde(rename = "_id")]
        id: ObjectId,
        name: String,
    }

    #[test]
    fn test_encode_struct_keeps_field_order() {
        let doc = encode(&Person {
            name: "bob".into(),
            surname: "joe".into(),
        })
        .unwrap();
        assert_eq!(doc, doc! { "name": "bob", "surname": "joe" });
        assert_eq!(doc.keys().collect::<Vec<_>>(), vec!["name", "surname"]);
    }

    #[test]
    fn test_encode_non_document_rejected() {
        let err = encode(&"just a string").unwrap_err();
        assert!(matches!(err, CnctError::Encode(_)));
    }

    #[test]
    fn test_decode_ignores_unknown_fields() {
        let person: Person = decode(doc! {
            "_id": ObjectId::new(),
            "name": "sally",
            "surname": "joe",
        })
        .unwrap();
        assert_eq!(person.name, "sally");
    }

    #[test]
    fn test_decode_missing_field_is_decode_error() {
        let err = decode::<Person>(doc! { "name": "bob" }).unwrap_err();
        assert!(matches!(err, CnctError::Decode(ref m) if m.contains("surname")));
    }

    #[test]
    fn test_decode_wrong_type_is_decode_error() {
        let err = decode::<Person>(doc! { "name": 7, "surname": "joe" }).unwrap_err();
        assert!(matches!(err, CnctError::Decode(_)));
    }

    #[test]
    fn test_decode_object_id() {
        let id = ObjectId::new();
        let stored: Stored = decode(doc! { "_id": id, "name": "bob" }).unwrap();
        assert_eq!(stored.id, id);
    }

    #[test]
    fn test_document_round_trips_arbitrary_shape() {
        let original = doc! {
            "name": "bob",
            "tags": ["a", "b"],
            "address": { "city": "Springfield", "zip": 12345 },
            "score": 4.5,
            "active": true,
            "nothing": Bson::Null,
        };
        let decoded: Document = decode(original.clone()).unwrap();
        assert_eq!(decoded, original);
    }
}
