//! MongoStore - MongoDB session over the official driver

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use contracts::{ContractError, StoreSettings, TelemetryRecord, TelemetryStore};
use mongodb::bson::{doc, Document};
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection, Database};
use tracing::{debug, error, info, instrument};

use crate::document::to_document;
use crate::metrics::StoreMetrics;

const APP_NAME: &str = "bike-bridge";

/// One client session against a MongoDB deployment
///
/// The driver pools connections internally; concurrent `write` calls share
/// the same `Client`.
pub struct MongoStore {
    name: String,
    client: Client,
    database: Database,
    collection: Collection<Document>,
    closed: AtomicBool,
    metrics: Arc<StoreMetrics>,
}

impl MongoStore {
    /// Build a session from a connection string
    ///
    /// `timeout` bounds server selection and socket connect for every operation.
    ///
    /// # Errors
    /// `StoreConnection` if the URI cannot be parsed or the client cannot be built
    #[instrument(name = "mongo_store_connect", skip(uri, settings), fields(database = %settings.database))]
    pub async fn connect(
        uri: &str,
        settings: &StoreSettings,
        timeout: Duration,
    ) -> Result<Self, ContractError> {
        let mut options = ClientOptions::parse(uri).await.map_err(|e| {
            error!(error = %e, "store connection failed");
            ContractError::store_connection(e.to_string())
        })?;
        options.app_name = Some(APP_NAME.to_string());
        options.server_selection_timeout = Some(timeout);
        options.connect_timeout = Some(timeout);

        let client = Client::with_options(options).map_err(|e| {
            error!(error = %e, "store connection failed");
            ContractError::store_connection(e.to_string())
        })?;

        let database = client.database(&settings.database);
        let collection = database.collection::<Document>(&settings.collection);
        info!(
            database = %settings.database,
            collection = %settings.collection,
            "store client created"
        );

        Ok(Self {
            name: format!("mongodb:{}.{}", settings.database, settings.collection),
            client,
            database,
            collection,
            closed: AtomicBool::new(false),
            metrics: Arc::new(StoreMetrics::new()),
        })
    }

    pub fn metrics(&self) -> Arc<StoreMetrics> {
        self.metrics.clone()
    }

    fn ensure_open(&self) -> Result<(), ContractError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ContractError::StoreClosed {
                name: self.name.clone(),
            });
        }
        Ok(())
    }
}

impl TelemetryStore for MongoStore {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "mongo_store_verify", skip(self), fields(store = %self.name))]
    async fn verify(&self) -> Result<(), ContractError> {
        self.ensure_open()?;
        match self.database.run_command(doc! { "ping": 1 }).await {
            Ok(_) => {
                info!("store ping ok");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "store ping failed");
                Err(ContractError::StorePing {
                    message: e.to_string(),
                })
            }
        }
    }

    #[instrument(
        name = "mongo_store_write",
        skip(self, record),
        fields(store = %self.name, device_id = %record.device_id)
    )]
    async fn write(&self, record: &TelemetryRecord) -> Result<(), ContractError> {
        self.ensure_open()?;

        let start = Instant::now();
        match self.collection.insert_one(to_document(record)).await {
            Ok(result) => {
                self.metrics.record_write(start.elapsed().as_micros() as u64);
                debug!(inserted_id = %result.inserted_id, "document inserted");
                Ok(())
            }
            Err(e) => {
                self.metrics.inc_failure_count();
                Err(ContractError::store_write(
                    self.collection.name(),
                    e.to_string(),
                ))
            }
        }
    }

    #[instrument(name = "mongo_store_close", skip(self), fields(store = %self.name))]
    async fn close(&self) -> Result<(), ContractError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.client.clone().shutdown().await;
        let snap = self.metrics.snapshot();
        info!(
            writes = snap.write_count,
            failures = snap.failure_count,
            "store disconnected"
        );
        Ok(())
    }
}
