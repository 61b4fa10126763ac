//! Core test fixtures for the collection handle.
//!
//! Every test gets its own uniquely named collection in a shared database so
//! tests can run in parallel without seeing each other's documents. The
//! MongoDB server comes from testcontainers-rs unless
//! `CNCT_TEST_MANUAL_CONTAINERS` is set, in which case a server on
//! `127.0.0.1:27018` is used.
//!
//! # Usage
//!
//! ```rust,ignore
//! use crate::fixtures::{seeded_collection, Person};
//!
//! #[tokio::test]
//! async fn test_find_bob() -> anyhow::Result<()> {
//!     let people = seeded_collection().await?;
//!     let bob: Person = people.find_one(doc! { "name": "bob" }).await?;
//!     people.cleanup().await
//! }
//! ```

use anyhow::{Context, Result};
use cnct_core::CollectionConfig;
use cnct_mongodb::MongoCollection;
use serde::{Deserialize, Serialize};
use std::env;
use std::ops::Deref;
use std::time::Duration;

use crate::test_containers::mongo_container;

/// Database every test collection lives in
pub const TEST_DATABASE: &str = "exampleDB";

/// Manually managed server used when `CNCT_TEST_MANUAL_CONTAINERS` is set
const MANUAL_URI: &str = "mongodb://127.0.0.1:27018";

/// The document shape used throughout the suite
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Person {
    /// Given name
    pub name: String,
    /// Family name
    pub surname: String,
}

impl Person {
    /// Create a person
    pub fn new(name: &str, surname: &str) -> Self {
        Self {
            name: name.to_string(),
            surname: surname.to_string(),
        }
    }
}

/// The two documents every seeded collection starts with
pub fn seed_people() -> Vec<Person> {
    vec![Person::new("bob", "joe"), Person::new("sally", "joe")]
}

/// A collection owned by one test
///
/// Dereferences to [`MongoCollection`]. Call [`cleanup`](Self::cleanup) at
/// the end of the test to drop the server-side collection.
pub struct TestCollection {
    handle: MongoCollection,
    config: CollectionConfig,
}

impl TestCollection {
    /// Configuration the handle was opened with
    pub fn config(&self) -> &CollectionConfig {
        &self.config
    }

    /// Drop the server-side collection
    pub async fn cleanup(self) -> Result<()> {
        self.handle
            .drop_collection()
            .await
            .context("failed to drop test collection")
    }
}

impl Deref for TestCollection {
    type Target = MongoCollection;

    fn deref(&self) -> &Self::Target {
        &self.handle
    }
}

/// Check if tests should use a manually managed server instead of testcontainers
///
/// Set CNCT_TEST_MANUAL_CONTAINERS=1 to use the server on 127.0.0.1:27018.
fn use_manual_containers() -> bool {
    env::var("CNCT_TEST_MANUAL_CONTAINERS")
        .ok()
        .and_then(|v| v.parse::<u8>().ok())
        .map(|v| v != 0)
        .unwrap_or(false)
}

/// URI of the server under test
pub async fn test_uri() -> Result<String> {
    if use_manual_containers() {
        return Ok(MANUAL_URI.to_string());
    }
    let container = mongo_container()
        .await
        .context("failed to start MongoDB container - is Docker running?")?;
    Ok(container.uri())
}

/// A configuration naming a fresh, uniquely named collection
pub async fn test_config() -> Result<CollectionConfig> {
    Ok(config_for(test_uri().await?))
}

/// A configuration for a fresh, uniquely named collection on `uri`
fn config_for(uri: String) -> CollectionConfig {
    let collection = format!("test_{}", uuid::Uuid::new_v4().simple());
    CollectionConfig::new(uri, TEST_DATABASE, collection)
        .with_connect_timeout(Duration::from_secs(10))
        .with_app_name("cnct-driver-tests")
}

/// Connect with retries, for servers still starting up
async fn wait_for_database_ready(
    config: &CollectionConfig,
    max_attempts: u32,
    base_delay_secs: u64,
) -> Result<MongoCollection> {
    let mut last_error = None;

    for attempt in 1..=max_attempts {
        match MongoCollection::connect(config).await {
            Ok(handle) => {
                if attempt > 1 {
                    tracing::info!(attempts = attempt, "database ready after retry");
                }
                return Ok(handle);
            }
            Err(e) => {
                last_error = Some(e);

                if attempt < max_attempts {
                    let delay = Duration::from_secs(base_delay_secs * attempt as u64);
                    tracing::warn!(
                        attempt = attempt,
                        max_attempts = max_attempts,
                        delay_secs = delay.as_secs(),
                        "database not ready, retrying..."
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    match last_error {
        Some(e) => Err(anyhow::Error::new(e)
            .context(format!("database not ready after {} attempts", max_attempts))),
        None => Err(anyhow::anyhow!("no connection attempts were made")),
    }
}

/// Open an empty collection for one test
pub async fn test_collection() -> Result<TestCollection> {
    initialize_logging();

    let config = test_config().await?;
    let handle = wait_for_database_ready(&config, 5, 2).await?;
    Ok(TestCollection { handle, config })
}

/// Open a collection holding bob and sally, both with surname "joe"
pub async fn seeded_collection() -> Result<TestCollection> {
    let collection = test_collection().await?;
    let ids = collection
        .insert_many(&seed_people())
        .await
        .context("failed to seed test collection")?;
    anyhow::ensure!(ids.len() == 2, "expected 2 seeded ids, got {}", ids.len());
    Ok(collection)
}

/// Initialize logging for tests if not already initialized
fn initialize_logging() {
    use std::sync::Once;
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("cnct_mongodb=debug,cnct_driver_tests=debug"));
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .finish();

        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
