//! Parishmap: vector tile container and church catalog server.
//!
//! Serves a pre-rendered MBTiles vector-tile dataset (reassembled from
//! on-disk chunks at start-up) and a searchable catalog of church
//! features loaded from GeoJSON sources. Both stores are read-only for
//! the lifetime of the process.
//!
//! # Example
//!
//! ```no_run
//! use parishmap::{Config, MapServer};
//!
//! #[tokio::main]
//! async fn main() {
//!     let server = MapServer::new(Config::default());
//!     server.run().await.unwrap();
//! }
//! ```

pub mod assemble;
pub mod catalog;
pub mod config;
pub mod error;
pub mod handlers;
pub mod query;
pub mod router;
pub mod server;
pub mod tiles;

// Re-exports for convenience
pub use assemble::{reassemble, Assembly};
pub use catalog::{Catalog, Church};
pub use config::{Args, Config, DEFAULT_PORT};
pub use error::{ServiceError, ServiceResult};
pub use router::{create_router, AppState};
pub use server::{build_app, MapServer};
pub use tiles::{MbtilesStore, TileMetadata, TilePayload, TileSource};
