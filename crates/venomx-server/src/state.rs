//! Process-wide state shared by every handler.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tokio::sync::Semaphore;
use tracing::{info, warn};
use venomx_config::Settings;
use venomx_routing::{DisabledRouter, OsrmRouter, RoutingProvider};
use venomx_store::{StoreError, VenomStore};
use venomx_vision::{OnnxIdentifier, SpeciesIdentifier};

use crate::error::AppError;

pub struct AppState {
    pub settings: Settings,
    pub store: Arc<VenomStore>,
    pub identifier: Arc<dyn SpeciesIdentifier>,
    pub router: Arc<dyn RoutingProvider>,
    pub inference_slots: Arc<Semaphore>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        settings: Settings,
        store: VenomStore,
        identifier: Arc<dyn SpeciesIdentifier>,
        router: Arc<dyn RoutingProvider>,
    ) -> Self {
        let inference_slots = Arc::new(Semaphore::new(settings.inference_workers));
        Self {
            settings,
            store: Arc::new(store),
            identifier,
            router,
            inference_slots,
            started_at: Instant::now(),
        }
    }

    /// Opens the store, seeds it if needed, loads both models and builds the
    /// routing client. Any failure aborts startup.
    pub fn initialize(settings: Settings) -> Result<Self> {
        let store = VenomStore::open(&settings.database_path).with_context(|| {
            format!("failed to open database at {}", settings.database_path.display())
        })?;

        match &settings.seed_data_path {
            Some(path) => {
                let seeded = store
                    .seed_from_file(path)
                    .with_context(|| format!("failed to seed from {}", path.display()))?;
                if seeded > 0 {
                    info!("Loaded {} species from seed data", seeded);
                }
            }
            None if store.is_empty()? => {
                warn!("Database is empty and SEED_DATA_PATH is not set");
            }
            None => {}
        }

        let identifier = OnnxIdentifier::load(
            &settings.detection_model_path,
            settings.detection_input_size,
            settings.detection_oriented,
            &settings.classification_model_path,
            &settings.classification_labels_path,
            settings.classification_input_size,
        )
        .context("failed to load inference models")?;

        let router: Arc<dyn RoutingProvider> = match &settings.osrm_base_url {
            Some(url) => {
                info!("Routing enabled via {}", url);
                Arc::new(
                    OsrmRouter::new(url.as_str(), settings.routing_timeout)
                        .context("failed to build routing client")?,
                )
            }
            None => {
                warn!("Routing disabled: OSRM_BASE_URL is empty");
                Arc::new(DisabledRouter)
            }
        };

        Ok(Self::new(settings, store, Arc::new(identifier), router))
    }

    /// Runs a store query on the blocking pool.
    pub async fn with_store<T, F>(&self, query: F) -> Result<T, AppError>
    where
        F: FnOnce(&VenomStore) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || query(&store))
            .await
            .map_err(AppError::internal)?
            .map_err(AppError::from)
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
