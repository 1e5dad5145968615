//! Service error types and HTTP response mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the tile and catalog services.
///
/// `TileNotFound` is an ordinary response outcome, not a fault: any
/// coordinate the dataset does not cover resolves to it. `NotReady`
/// is distinguishable from not-found and means a shared dependency has
/// not finished start-up initialization. Unparseable pagination input
/// never surfaces here; it defaults at the parse site.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A shared dependency (tile store, corpus) is not yet initialized.
    #[error("{0} not loaded")]
    NotReady(&'static str),

    /// No tile exists at the requested coordinate.
    #[error("tile not found")]
    TileNotFound,

    /// The chunk list was empty and no container exists to serve from.
    #[error("no container chunks found under {0}")]
    NoChunks(PathBuf),

    /// Every feature source failed to load.
    #[error("no feature sources could be loaded")]
    EmptyCorpus,

    /// Tile container (SQLite) failure.
    #[error("tile container error: {0}")]
    Container(#[from] rusqlite::Error),

    /// Chunk or source file I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServiceError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::TileNotFound => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            // Missing tiles get a plain text body; map clients only
            // look at the status.
            ServiceError::TileNotFound => (status, "Tile not found").into_response(),
            other => {
                let body = axum::Json(json!({ "error": other.to_string() }));
                (status, body).into_response()
            }
        }
    }
}

/// Result type alias for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;
