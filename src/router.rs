//! Routing and shared application state.

use axum::{routing::get, Router};
use std::sync::{Arc, OnceLock};

use crate::catalog::Catalog;
use crate::config::Config;
use crate::error::{ServiceError, ServiceResult};
use crate::handlers;
use crate::tiles::TileSource;

/// Application state shared between handlers.
///
/// The tile store and the catalog are write-once: installed by the
/// start-up sequence before the listener is bound, then strictly
/// read-only. A request arriving against an empty cell answers
/// `NotReady`, distinguishable from a tile-level not-found.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    tiles: Arc<OnceLock<Arc<dyn TileSource>>>,
    catalog: Arc<OnceLock<Arc<Catalog>>>,
}

impl AppState {
    /// Creates state with uninitialized stores.
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            tiles: Arc::new(OnceLock::new()),
            catalog: Arc::new(OnceLock::new()),
        }
    }

    /// Installs the tile store. Only the first installation takes
    /// effect; the cell is write-once.
    pub fn install_tiles(&self, tiles: Arc<dyn TileSource>) {
        let _ = self.tiles.set(tiles);
    }

    /// Installs the church catalog. Write-once, as above.
    pub fn install_catalog(&self, catalog: Arc<Catalog>) {
        let _ = self.catalog.set(catalog);
    }

    pub fn tiles(&self) -> ServiceResult<&Arc<dyn TileSource>> {
        self.tiles.get().ok_or(ServiceError::NotReady("tile store"))
    }

    pub fn catalog(&self) -> ServiceResult<&Arc<Catalog>> {
        self.catalog.get().ok_or(ServiceError::NotReady("church catalog"))
    }
}

/// Creates the service router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/metadata", get(handlers::metadata))
        .route("/tiles/:z/:x/:y", get(handlers::tile))
        .route("/churches", get(handlers::churches))
        .route("/filter", get(handlers::filter))
        .with_state(state)
}
