//! Update operation tests.
//!
//! Test categories:
//! - update_one touches at most one document
//! - update_many reports matched and modified separately
//! - No matching documents is (0, 0), not an error
//! - Invalid update documents are rejected before reaching the server

use crate::fixtures::{Person, seeded_collection};
use anyhow::Result;
use bson::doc;
use cnct_core::{CnctError, UpdateOutcome};
use cnct_mongodb::Update;
use pretty_assertions::assert_eq;

#[tokio::test]
async fn test_update_one_present() -> Result<()> {
    let people = seeded_collection().await?;

    let outcome = people
        .update_one(doc! { "name": "bob" }, Update::new().set("surname", "lee"))
        .await?;
    assert_eq!(outcome, UpdateOutcome::new(1, 1));

    let bob: Person = people.find_one(doc! { "name": "bob" }).await?;
    assert_eq!(bob, Person::new("bob", "lee"));

    people.cleanup().await
}

/// Only one document changes even when several match
#[tokio::test]
async fn test_update_one_with_multiple_matches() -> Result<()> {
    let people = seeded_collection().await?;

    let outcome = people
        .update_one(
            doc! { "surname": "joe" },
            doc! { "$set": { "surname": "smith" } },
        )
        .await?;
    assert_eq!((outcome.matched, outcome.modified), (1, 1));
    assert_eq!(people.count(doc! { "surname": "joe" }).await?, 1);
    assert_eq!(people.count(doc! { "surname": "smith" }).await?, 1);

    people.cleanup().await
}

#[tokio::test]
async fn test_update_one_not_present() -> Result<()> {
    let people = seeded_collection().await?;

    let outcome = people
        .update_one(doc! { "name": "john" }, Update::new().set("surname", "lee"))
        .await?;
    assert!(outcome.is_unmatched());
    assert_eq!(outcome, UpdateOutcome::default());

    people.cleanup().await
}

#[tokio::test]
async fn test_update_many_then_repeat_is_unmodified() -> Result<()> {
    let people = seeded_collection().await?;
    let to_doe = || Update::new().set("surname", "doe");

    let first = people
        .update_many(doc! { "surname": "joe" }, to_doe())
        .await?;
    assert_eq!((first.matched, first.modified), (2, 2));

    let again = people
        .update_many(doc! { "surname": "doe" }, to_doe())
        .await?;
    assert_eq!((again.matched, again.modified), (2, 0));
    assert_eq!(again.unchanged(), 2);

    let mut everyone: Vec<Person> = people.find_many(doc! {}).await?;
    everyone.sort();
    assert_eq!(
        everyone,
        vec![Person::new("bob", "doe"), Person::new("sally", "doe")]
    );

    people.cleanup().await
}

#[tokio::test]
async fn test_update_many_partially_modified() -> Result<()> {
    let people = seeded_collection().await?;
    people
        .update_one(doc! { "name": "sally" }, Update::new().set("surname", "doe"))
        .await?;

    // sally already holds the target value, bob does not
    let outcome = people
        .update_many(doc! {}, Update::new().set("surname", "doe"))
        .await?;
    assert_eq!(outcome, UpdateOutcome::new(2, 1));
    assert!(outcome.modified <= outcome.matched);

    people.cleanup().await
}

#[tokio::test]
async fn test_update_many_not_present() -> Result<()> {
    let people = seeded_collection().await?;

    let outcome = people
        .update_many(doc! { "surname": "nobody" }, Update::new().inc("visits", 1))
        .await?;
    assert_eq!(outcome, UpdateOutcome::new(0, 0));

    people.cleanup().await
}

#[tokio::test]
async fn test_update_rejects_replacement_document() -> Result<()> {
    let people = seeded_collection().await?;

    let err = people
        .update_many(doc! { "name": "bob" }, doc! { "surname": "lee" })
        .await
        .unwrap_err();
    assert!(matches!(err, CnctError::InvalidUpdate(_)));

    let bob: Person = people.find_one(doc! { "name": "bob" }).await?;
    assert_eq!(bob.surname, "joe");

    people.cleanup().await
}

#[tokio::test]
async fn test_update_with_several_operators() -> Result<()> {
    let people = seeded_collection().await?;

    let outcome = people
        .update_one(
            doc! { "name": "bob" },
            Update::new().inc("visits", 2).push("tags", "vip").set("surname", "lee"),
        )
        .await?;
    assert_eq!(outcome, UpdateOutcome::new(1, 1));

    let raw: bson::Document = people.find_one(doc! { "name": "bob" }).await?;
    assert_eq!(raw.get_i32("visits")?, 2);
    assert_eq!(raw.get_array("tags")?.len(), 1);
    assert_eq!(raw.get_str("surname")?, "lee");

    people.cleanup().await
}
