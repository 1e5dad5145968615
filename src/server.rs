//! HTTP server and start-up sequencing.

use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::assemble::{reassemble, Assembly};
use crate::catalog::Catalog;
use crate::config::Config;
use crate::error::ServiceResult;
use crate::router::{create_router, AppState};
use crate::tiles::MbtilesStore;

/// Map service server.
pub struct MapServer {
    config: Arc<Config>,
}

impl MapServer {
    /// Creates a new server from configuration.
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Runs the ordered start-up sequence and returns ready state:
    /// reassemble the container, open the tile store, load the corpus.
    /// Metadata and corpus are fully loaded before this returns, so a
    /// caller that only binds its listener afterwards never serves a
    /// `NotReady` response in practice.
    ///
    /// An I/O failure here is fatal; a missing chunk or feature source
    /// degrades to a partial dataset with a warning.
    pub async fn initialize(&self) -> ServiceResult<AppState> {
        let state = AppState::new(self.config.clone());

        let chunks = self.config.chunk_paths()?;
        let assembly = reassemble(&chunks, &self.config.container).await?;
        if let Assembly::Partial { missing, .. } = &assembly {
            warn!(
                missing = missing.len(),
                "serving a partial container; advertised coverage exceeds actual tiles"
            );
        }

        let store = MbtilesStore::open(&self.config.container)?;
        state.install_tiles(Arc::new(store));

        let sources = self.config.feature_paths()?;
        let catalog = Catalog::load(&sources).await?;
        state.install_catalog(Arc::new(catalog));

        Ok(state)
    }

    /// Initializes the service and runs it until shutdown.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let state = self.initialize().await?;
        let app = build_app(state);

        let addr: SocketAddr = self.config.bind_address().parse()?;
        let listener = TcpListener::bind(addr).await?;
        info!("parishmap serving at http://{}", addr);
        axum::serve(listener, app).await?;

        Ok(())
    }

    /// Returns the configured bind address.
    pub fn bind_address(&self) -> String {
        self.config.bind_address()
    }
}

/// Applies the service middleware stack: open CORS (the dataset is
/// public) and request tracing.
pub fn build_app(state: AppState) -> Router {
    create_router(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
