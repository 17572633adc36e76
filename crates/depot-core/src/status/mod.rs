//! Fleet health snapshot: registered workers plus message broker connectivity.

use std::sync::Arc;

use async_trait::async_trait;
use depot_model::{API_VERSION, StatusReport};
use tracing::{debug, instrument};

use crate::{error::CoreError, store::WorkerRegistry};

/// Reports whether the message broker connection is up.
#[async_trait]
pub trait BrokerProbe: Send + Sync + 'static {
    async fn is_connected(&self) -> bool;
}

/// Probe with a fixed answer, for deployments without a broker and for tests.
#[derive(Debug, Clone, Copy)]
pub struct StaticProbe(pub bool);

#[async_trait]
impl BrokerProbe for StaticProbe {
    async fn is_connected(&self) -> bool {
        self.0
    }
}

pub struct StatusManager {
    workers: Arc<dyn WorkerRegistry>,
    broker: Arc<dyn BrokerProbe>,
    platform_version: String,
}

impl StatusManager {
    pub fn new(workers: Arc<dyn WorkerRegistry>, broker: Arc<dyn BrokerProbe>) -> Self {
        Self {
            workers,
            broker,
            platform_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Override the reported platform version (normally the installed server package version).
    pub fn with_platform_version(mut self, version: impl Into<String>) -> Self {
        self.platform_version = version.into();
        self
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn status(&self) -> Result<StatusReport, CoreError> {
        let mut workers = self.workers.list_all().await?;
        workers.sort_by(|a, b| a.name.cmp(&b.name));
        let messaging_connected = self.broker.is_connected().await;

        debug!(workers = workers.len(), messaging_connected, "status collected");
        Ok(StatusReport {
            api_version: API_VERSION.to_string(),
            platform_version: self.platform_version.clone(),
            messaging_connected,
            workers,
        })
    }
}
