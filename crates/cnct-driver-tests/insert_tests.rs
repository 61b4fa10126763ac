//! Insert operation tests.
//!
//! Test categories:
//! - Single inserts return the generated id and round trip through find
//! - Batch inserts return ids in input order
//! - Duplicate keys surface the driver error untouched

use crate::fixtures::{Person, test_collection};
use anyhow::Result;
use bson::{Bson, doc, oid::ObjectId};
use cnct_core::CnctError;
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde::{Deserialize, Serialize};

#[tokio::test]
async fn test_insert_one_then_find_by_each_field() -> Result<()> {
    let people = test_collection().await?;

    // make sure john doesn't exist before
    let err = people
        .find_one::<Person>(doc! { "name": "john" })
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let john = Person::new("john", "smith");
    let id = people.insert_one(&john).await?;
    assert!(matches!(id, Bson::ObjectId(_)));

    let by_name: Person = people.find_one(doc! { "name": "john" }).await?;
    let by_surname: Person = people.find_one(doc! { "surname": "smith" }).await?;
    let by_id: Person = people.find_one(doc! { "_id": id }).await?;
    assert_eq!(by_name, john);
    assert_eq!(by_surname, john);
    assert_eq!(by_id, john);

    people.cleanup().await
}

#[tokio::test]
async fn test_insert_one_keeps_caller_id() -> Result<()> {
    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Keyed {
        #[serde(rename = "_id")]
        id: String,
        name: String,
    }

    let people = test_collection().await?;
    let keyed = Keyed {
        id: "user-1".into(),
        name: "bob".into(),
    };

    let id = people.insert_one(&keyed).await?;
    assert_eq!(id, Bson::String("user-1".into()));

    let stored: Keyed = people.find_one(doc! { "_id": "user-1" }).await?;
    assert_eq!(stored, keyed);

    people.cleanup().await
}

#[rstest]
#[case::two(2)]
#[case::ten(10)]
#[tokio::test]
async fn test_insert_many_returns_ids_in_input_order(#[case] size: usize) -> Result<()> {
    let people = test_collection().await?;
    let batch: Vec<_> = (0..size)
        .map(|i| doc! { "_id": ObjectId::new(), "name": format!("person-{}", i) })
        .collect();

    let ids = people.insert_many(&batch).await?;
    let expected: Vec<Bson> = batch.iter().map(|d| d.get("_id").cloned().unwrap()).collect();
    assert_eq!(ids, expected);
    assert_eq!(people.count(doc! {}).await?, size as u64);

    people.cleanup().await
}

#[tokio::test]
async fn test_insert_many_generates_ids() -> Result<()> {
    let people = test_collection().await?;
    let batch = vec![Person::new("bob", "joe"), Person::new("sally", "joe")];

    let ids = people.insert_many(&batch).await?;
    assert_eq!(ids.len(), 2);
    assert!(ids.iter().all(|id| matches!(id, Bson::ObjectId(_))));
    assert_ne!(ids[0], ids[1]);

    people.cleanup().await
}

#[tokio::test]
async fn test_insert_one_duplicate_id_surfaces_driver_error() -> Result<()> {
    let people = test_collection().await?;
    people.insert_one(&doc! { "_id": 1, "name": "bob" }).await?;

    let err = people
        .insert_one(&doc! { "_id": 1, "name": "bob again" })
        .await
        .unwrap_err();

    match &err {
        CnctError::Driver { operation, source } => {
            assert_eq!(*operation, "insert_one");
            assert!(source.downcast_ref::<mongodb::error::Error>().is_some());
            assert!(err.to_string().contains("E11000"), "got {err}");
        }
        other => panic!("expected driver error, got {other:?}"),
    }
    assert_eq!(people.count(doc! {}).await?, 1);

    people.cleanup().await
}

#[tokio::test]
async fn test_insert_many_duplicate_id_surfaces_driver_error() -> Result<()> {
    let people = test_collection().await?;
    let batch = vec![
        doc! { "_id": 1, "name": "bob" },
        doc! { "_id": 1, "name": "bob again" },
    ];

    let err = people.insert_many(&batch).await.unwrap_err();
    assert!(matches!(err, CnctError::Driver { operation: "insert_many", .. }));

    people.cleanup().await
}
