//! Docker container management for integration tests.
//!
//! The MongoDB container is started lazily by the first test that asks for
//! it and cached in a static for every later test in the process, so it
//! lives until the test process exits.
//!
//! # Usage
//!
//! Tests normally go through `fixtures::test_collection()`. Direct use:
//!
//! ```rust,ignore
//! use crate::test_containers::mongo_container;
//!
//! let container = mongo_container().await?;
//! let uri = container.uri();
//! ```

use once_cell::sync::Lazy;
use std::sync::{Arc, Mutex};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::mongo::Mongo;

/// Port MongoDB listens on inside the container
const MONGO_INTERNAL_PORT: u16 = 27017;

/// Information about a running test container
#[derive(Clone, Debug)]
pub struct ContainerInfo {
    /// Host address (typically 127.0.0.1)
    pub host: String,
    /// Port number (randomly assigned by testcontainers)
    pub port: u16,
}

impl ContainerInfo {
    /// Connection URI for this container
    pub fn uri(&self) -> String {
        format!("mongodb://{}:{}", self.host, self.port)
    }
}

/// MongoDB container, kept alive for the whole test run
struct MongoContainer {
    #[allow(dead_code)]
    inner: ContainerAsync<Mongo>,
    info: ContainerInfo,
}

/// Global MongoDB container instance
static MONGO_CONTAINER: Lazy<Arc<Mutex<Option<MongoContainer>>>> =
    Lazy::new(|| Arc::new(Mutex::new(None)));

/// Serializes container startup so concurrent tests start only one container
static MONGO_STARTUP: Lazy<tokio::sync::Mutex<()>> = Lazy::new(|| tokio::sync::Mutex::new(()));

fn cached_info() -> anyhow::Result<Option<ContainerInfo>> {
    let guard = MONGO_CONTAINER
        .lock()
        .map_err(|e| anyhow::anyhow!("failed to lock mongo container: {}", e))?;
    Ok(guard.as_ref().map(|container| container.info.clone()))
}

/// Get or start the shared MongoDB container
pub async fn mongo_container() -> anyhow::Result<ContainerInfo> {
    if let Some(info) = cached_info()? {
        return Ok(info);
    }

    let _startup = MONGO_STARTUP.lock().await;
    if let Some(info) = cached_info()? {
        return Ok(info);
    }

    tracing::info!("starting MongoDB test container");

    let container = Mongo::default()
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("failed to start mongo container: {}", e))?;

    let host_port = container
        .get_host_port_ipv4(MONGO_INTERNAL_PORT)
        .await
        .map_err(|e| anyhow::anyhow!("failed to get mongo port: {}", e))?;

    let info = ContainerInfo {
        host: "127.0.0.1".to_string(),
        port: host_port,
    };

    tracing::info!(port = host_port, "MongoDB test container started successfully");

    {
        let mut guard = MONGO_CONTAINER
            .lock()
            .map_err(|e| anyhow::anyhow!("failed to lock mongo container: {}", e))?;

        *guard = Some(MongoContainer {
            inner: container,
            info: info.clone(),
        });
    }

    Ok(info)
}
