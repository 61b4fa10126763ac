//! MongoDB collection handle
//!
//! [`MongoCollection`] forwards one CRUD verb per method to the driver. Each
//! method starts a fresh [`Deadline`] from the handle's timeout, runs the
//! driver call inside it and converts the driver's result into cnct types.

use crate::codec;
use crate::deadline::Deadline;
use crate::update::validate_update;
use bson::{Bson, Document, doc};
use cnct_core::{CnctError, CollectionConfig, Result, UpdateOutcome};
use futures::TryStreamExt;
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection, Namespace};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Smallest server-side time limit sent with a read; `maxTimeMS: 0` means unlimited
const MIN_SERVER_TIME_LIMIT: Duration = Duration::from_millis(1);

/// Largest `maxTimeMS` the server accepts
const MAX_SERVER_TIME_LIMIT: Duration = Duration::from_millis(i32::MAX as u64);

/// Handle to a single MongoDB collection
///
/// Cloning is cheap and clones share the driver's connection pool. The handle
/// holds no mutable state: the timeout is copied into a new [`Deadline`] at
/// the start of every call.
#[derive(Debug, Clone)]
pub struct MongoCollection {
    collection: Collection<Document>,
    timeout: Duration,
}

impl MongoCollection {
    /// Connect to the server named by `config` and open its collection
    ///
    /// The client is pinged before the handle is returned so an unreachable
    /// server is reported here rather than on the first operation.
    #[tracing::instrument(skip(config), fields(database = %config.database, collection = %config.collection))]
    pub async fn connect(config: &CollectionConfig) -> Result<Self> {
        config.validate()?;
        tracing::info!("connecting to MongoDB");

        let deadline = Deadline::start("connect", config.connect_timeout);
        let client = deadline
            .run(Self::open_client(config))
            .await
            .map_err(|e| match e {
                CnctError::Timeout { timeout, .. } => CnctError::Connection(format!(
                    "MongoDB did not answer within {:?}",
                    timeout
                )),
                other => other,
            })?;

        tracing::info!("connection established");
        Ok(Self::from_client(
            &client,
            &config.database,
            &config.collection,
            config.timeout,
        ))
    }

    /// Connect, or log the failure and terminate the process
    ///
    /// For binaries that treat the database as a startup precondition.
    pub async fn connect_or_exit(config: &CollectionConfig) -> Self {
        match Self::connect(config).await {
            Ok(collection) => collection,
            Err(e) => {
                tracing::error!(error = %e, "could not open MongoDB collection, exiting");
                std::process::exit(1);
            }
        }
    }

    async fn open_client(config: &CollectionConfig) -> Result<Client> {
        let mut options = ClientOptions::parse(&config.uri)
            .await
            .map_err(|e| CnctError::Connection(format!("Failed to parse MongoDB options: {}", e)))?;
        options.connect_timeout = Some(config.connect_timeout);
        options.server_selection_timeout = Some(config.connect_timeout);
        if let Some(app_name) = &config.app_name {
            options.app_name = Some(app_name.clone());
        }

        let client = Client::with_options(options)
            .map_err(|e| CnctError::Connection(format!("Failed to create MongoDB client: {}", e)))?;

        client
            .database(&config.database)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| CnctError::Connection(format!("Failed to connect to MongoDB: {}", e)))?;

        Ok(client)
    }

    /// Open `database.collection` on an existing client
    pub fn from_client(client: &Client, database: &str, collection: &str, timeout: Duration) -> Self {
        Self::from_collection(client.database(database).collection(collection), timeout)
    }

    /// Wrap an already opened driver collection
    pub fn from_collection(collection: Collection<Document>, timeout: Duration) -> Self {
        Self {
            collection,
            timeout,
        }
    }

    /// A handle on the same collection whose calls use `timeout`
    ///
    /// `self` keeps its own timeout, so both handles can be used at once.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        Self {
            collection: self.collection.clone(),
            timeout,
        }
    }

    /// Per-call timeout of this handle
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Collection name
    pub fn name(&self) -> &str {
        self.collection.name()
    }

    /// Database and collection name
    pub fn namespace(&self) -> Namespace {
        self.collection.namespace()
    }

    /// The underlying driver collection
    pub fn inner(&self) -> &Collection<Document> {
        &self.collection
    }

    fn deadline(&self, operation: &'static str) -> Deadline {
        Deadline::start(operation, self.timeout)
    }

    /// Delete the whole server-side collection
    ///
    /// This removes every document and index. It does not close the handle.
    #[tracing::instrument(skip(self), fields(collection = %self.name()))]
    pub async fn drop_collection(&self) -> Result<()> {
        self.deadline("drop_collection")
            .run(async {
                self.collection
                    .drop()
                    .await
                    .map_err(|e| CnctError::driver("drop_collection", e))
            })
            .await?;
        tracing::debug!("collection dropped");
        Ok(())
    }

    /// Decode the first document matching `filter` into `T`
    ///
    /// Fails with [`CnctError::NotFound`] when nothing matches and with
    /// [`CnctError::Decode`] when the document does not fit `T`.
    #[tracing::instrument(skip(self, filter), fields(collection = %self.name(), filter = %filter))]
    pub async fn find_one<T>(&self, filter: Document) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let deadline = self.deadline("find_one");
        let found = deadline
            .run(async {
                self.collection
                    .find_one(filter.clone())
                    .max_time(server_time_limit(&deadline)?)
                    .await
                    .map_err(|e| CnctError::driver("find_one", e))
            })
            .await?;

        match found {
            Some(document) => codec::decode(document),
            None => {
                tracing::debug!("no document matched");
                Err(CnctError::NotFound(format!(
                    "no document in {} matches {}",
                    self.name(),
                    filter
                )))
            }
        }
    }

    /// Decode every document matching `filter` into a `Vec<T>`
    ///
    /// Order is whatever the server returns. No match is an empty vector.
    pub async fn find_many<T>(&self, filter: Document) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let mut documents = Vec::new();
        self.find_many_into(filter, &mut documents).await?;
        Ok(documents)
    }

    /// Append the decode of every document matching `filter` to `out`
    ///
    /// Returns how many elements were appended. On any error `out` is left
    /// as it was. The cursor belongs to this call and is dropped on every
    /// exit path, which releases it on the server.
    #[tracing::instrument(skip(self, filter, out), fields(collection = %self.name(), filter = %filter))]
    pub async fn find_many_into<T>(&self, filter: Document, out: &mut Vec<T>) -> Result<usize>
    where
        T: DeserializeOwned,
    {
        let deadline = self.deadline("find_many");
        let start_len = out.len();

        let result = deadline
            .run(async {
                let mut cursor = self
                    .collection
                    .find(filter)
                    .max_time(server_time_limit(&deadline)?)
                    .await
                    .map_err(|e| CnctError::driver("find_many", e))?;

                while let Some(document) = cursor
                    .try_next()
                    .await
                    .map_err(|e| CnctError::driver("find_many", e))?
                {
                    out.push(codec::decode(document)?);
                }
                Ok(())
            })
            .await;

        if let Err(e) = result {
            out.truncate(start_len);
            return Err(e);
        }

        let appended = out.len() - start_len;
        tracing::debug!(appended, "documents decoded");
        Ok(appended)
    }

    /// Number of documents matching `filter`
    #[tracing::instrument(skip(self, filter), fields(collection = %self.name(), filter = %filter))]
    pub async fn count(&self, filter: Document) -> Result<u64> {
        let deadline = self.deadline("count");
        deadline
            .run(async {
                self.collection
                    .count_documents(filter)
                    .max_time(server_time_limit(&deadline)?)
                    .await
                    .map_err(|e| CnctError::driver("count", e))
            })
            .await
    }

    /// Apply `update` to at most one document matching `filter`
    ///
    /// Both counts are 0 or 1; `(0, 0)` means nothing matched.
    #[tracing::instrument(skip(self, filter, update), fields(collection = %self.name(), filter = %filter))]
    pub async fn update_one(
        &self,
        filter: Document,
        update: impl Into<Document>,
    ) -> Result<UpdateOutcome> {
        let update = update.into();
        validate_update(&update)?;

        let result = self
            .deadline("update_one")
            .run(async {
                self.collection
                    .update_one(filter, update)
                    .await
                    .map_err(|e| CnctError::driver("update_one", e))
            })
            .await?;

        let outcome = UpdateOutcome::new(result.matched_count, result.modified_count);
        tracing::debug!(matched = outcome.matched, modified = outcome.modified, "update applied");
        Ok(outcome)
    }

    /// Apply `update` to every document matching `filter`
    ///
    /// A match that already holds the target values counts as matched but
    /// not modified.
    #[tracing::instrument(skip(self, filter, update), fields(collection = %self.name(), filter = %filter))]
    pub async fn update_many(
        &self,
        filter: Document,
        update: impl Into<Document>,
    ) -> Result<UpdateOutcome> {
        let update = update.into();
        validate_update(&update)?;

        let result = self
            .deadline("update_many")
            .run(async {
                self.collection
                    .update_many(filter, update)
                    .await
                    .map_err(|e| CnctError::driver("update_many", e))
            })
            .await?;

        let outcome = UpdateOutcome::new(result.matched_count, result.modified_count);
        tracing::debug!(matched = outcome.matched, modified = outcome.modified, "update applied");
        Ok(outcome)
    }

    /// Insert one value and return its `_id`
    ///
    /// When the value has no `_id` the driver generates an `ObjectId`.
    #[tracing::instrument(skip(self, document), fields(collection = %self.name()))]
    pub async fn insert_one<T>(&self, document: &T) -> Result<Bson>
    where
        T: Serialize + ?Sized,
    {
        let document = codec::encode(document)?;

        let result = self
            .deadline("insert_one")
            .run(async {
                self.collection
                    .insert_one(document)
                    .await
                    .map_err(|e| CnctError::driver("insert_one", e))
            })
            .await?;

        tracing::debug!(id = %result.inserted_id, "document inserted");
        Ok(result.inserted_id)
    }

    /// Insert several values and return their `_id`s in input order
    ///
    /// An empty input is a no-op that returns no ids.
    #[tracing::instrument(skip(self, documents), fields(collection = %self.name()))]
    pub async fn insert_many<'a, T, I>(&self, documents: I) -> Result<Vec<Bson>>
    where
        T: Serialize + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        let documents = documents
            .into_iter()
            .map(codec::encode)
            .collect::<Result<Vec<Document>>>()?;
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let result = self
            .deadline("insert_many")
            .run(async {
                self.collection
                    .insert_many(documents)
                    .await
                    .map_err(|e| CnctError::driver("insert_many", e))
            })
            .await?;

        let mut indexed: Vec<(usize, Bson)> = result.inserted_ids.into_iter().collect();
        indexed.sort_by_key(|(index, _)| *index);
        tracing::debug!(inserted = indexed.len(), "documents inserted");
        Ok(indexed.into_iter().map(|(_, id)| id).collect())
    }

    /// Delete the first document matching `filter`, returning 0 or 1
    #[tracing::instrument(skip(self, filter), fields(collection = %self.name(), filter = %filter))]
    pub async fn delete_one(&self, filter: Document) -> Result<u64> {
        let result = self
            .deadline("delete_one")
            .run(async {
                self.collection
                    .delete_one(filter)
                    .await
                    .map_err(|e| CnctError::driver("delete_one", e))
            })
            .await?;

        tracing::debug!(deleted = result.deleted_count, "delete applied");
        Ok(result.deleted_count)
    }

    /// Delete every document matching `filter`, returning how many went
    #[tracing::instrument(skip(self, filter), fields(collection = %self.name(), filter = %filter))]
    pub async fn delete_many(&self, filter: Document) -> Result<u64> {
        let result = self
            .deadline("delete_many")
            .run(async {
                self.collection
                    .delete_many(filter)
                    .await
                    .map_err(|e| CnctError::driver("delete_many", e))
            })
            .await?;

        tracing::debug!(deleted = result.deleted_count, "delete applied");
        Ok(result.deleted_count)
    }
}

/// Server-side `maxTimeMS` for a read, so the server gives up with the caller
pub(crate) fn server_time_limit(deadline: &Deadline) -> Result<Duration> {
    let remaining = deadline.remaining();
    if remaining.is_zero() {
        return Err(deadline.elapsed_error());
    }
    Ok(remaining.clamp(MIN_SERVER_TIME_LIMIT, MAX_SERVER_TIME_LIMIT))
}
