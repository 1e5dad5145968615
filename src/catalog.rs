//! Church feature catalog: GeoJSON models and the corpus loader.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;
use tokio::fs;
use tracing::{info, warn};

use crate::error::{ServiceError, ServiceResult};

/// One GeoJSON feature collection source file.
#[derive(Debug, Default, Deserialize)]
pub struct FeatureCollection {
    #[serde(default)]
    pub features: Vec<Church>,
}

/// One church feature: a geometry (a coordinate pair for the point
/// case, passed through verbatim) plus a property bag. Unknown members
/// are preserved so features round-trip unchanged to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Church {
    #[serde(default)]
    pub geometry: Value,
    #[serde(default)]
    pub properties: ChurchProperties,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Named string fields of a church feature. The source data uses
/// capitalized keys.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChurchProperties {
    #[serde(rename = "Title", default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "Address", default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(rename = "Country", default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(rename = "Jurisdiction", default, skip_serializing_if = "Option::is_none")]
    pub jurisdiction: Option<String>,
    #[serde(rename = "Type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(rename = "Rite", default, skip_serializing_if = "Option::is_none")]
    pub rite: Option<String>,
    #[serde(rename = "City", default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChurchProperties {
    /// The fields free-text search runs against. City is a
    /// display-only field and deliberately not searched.
    pub(crate) fn search_fields(&self) -> [Option<&str>; 6] {
        [
            self.title.as_deref(),
            self.address.as_deref(),
            self.country.as_deref(),
            self.jurisdiction.as_deref(),
            self.kind.as_deref(),
            self.rite.as_deref(),
        ]
    }
}

/// The full ordered corpus of church features. Immutable after load;
/// lives for the lifetime of the process.
#[derive(Debug, Default)]
pub struct Catalog {
    churches: Vec<Church>,
}

impl Catalog {
    /// Builds a catalog from an already-loaded feature sequence.
    pub fn new(churches: Vec<Church>) -> Self {
        Self { churches }
    }

    /// Loads every source in declared order into one unified sequence.
    ///
    /// Each source is parsed independently; a missing or malformed
    /// source is skipped with a warning rather than aborting, matching
    /// the reassembler's best-effort policy. The load is fatal only if
    /// no source could be read at all. Concatenation order is the
    /// declaration order of `paths`, and record order within a source
    /// is file order — the implicit stable key for unfiltered
    /// pagination.
    pub async fn load(paths: &[PathBuf]) -> ServiceResult<Catalog> {
        let mut churches = Vec::new();
        let mut loaded = 0usize;

        for path in paths {
            let bytes = match fs::read(path).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(source = %path.display(), error = %e, "feature source unreadable, skipping");
                    continue;
                }
            };
            match serde_json::from_slice::<FeatureCollection>(&bytes) {
                Ok(collection) => {
                    churches.extend(collection.features);
                    loaded += 1;
                }
                Err(e) => {
                    warn!(source = %path.display(), error = %e, "feature source malformed, skipping");
                }
            }
        }

        if loaded == 0 {
            return Err(ServiceError::EmptyCorpus);
        }

        info!(churches = churches.len(), sources = loaded, "church catalog loaded");
        Ok(Catalog::new(churches))
    }

    /// The full corpus in load order.
    pub fn churches(&self) -> &[Church] {
        &self.churches
    }

    pub fn len(&self) -> usize {
        self.churches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.churches.is_empty()
    }
}
