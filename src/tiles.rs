//! Tile store: coordinate-keyed reads over the reassembled MBTiles
//! container.

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags, OptionalExtension};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use tracing::info;

use crate::error::{ServiceError, ServiceResult};

/// Fallback spatial bounds when the container does not declare any
/// (whole Web Mercator world).
pub const DEFAULT_BOUNDS: [f64; 4] = [-180.0, -85.0511, 180.0, 85.0511];

/// Descriptor of the container's coordinate domain. Read once at open,
/// immutable afterwards, shared by every request.
#[derive(Debug, Clone, Serialize)]
pub struct TileMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    pub bounds: [f64; 4],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub center: Option<Vec<f64>>,
    pub minzoom: u8,
    pub maxzoom: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribution: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub vector_layers: Vec<Value>,
}

impl TileMetadata {
    /// Identifier of the first vector layer, used by clients to bind
    /// map styles to the dataset.
    pub fn source_layer_id(&self) -> &str {
        self.vector_layers
            .first()
            .and_then(|layer| layer.get("id"))
            .and_then(Value::as_str)
            .unwrap_or("parishes")
    }
}

/// An opaque tile blob plus its content headers. Payloads are shared
/// bytes; the backing container is never mutated after open, so
/// concurrent reads need no coordination.
#[derive(Debug, Clone)]
pub struct TilePayload {
    pub data: Bytes,
    pub content_type: &'static str,
    pub content_encoding: Option<&'static str>,
}

/// Read-only source of tiles and their metadata.
#[async_trait]
pub trait TileSource: Send + Sync {
    /// The immutable container descriptor.
    fn metadata(&self) -> &TileMetadata;

    /// Resolves an XYZ coordinate to its payload. Coordinates the
    /// dataset does not cover yield [`ServiceError::TileNotFound`];
    /// that is the expected response, not a fault.
    async fn tile(&self, z: u8, x: u32, y: u32) -> ServiceResult<TilePayload>;
}

/// Tile source backed by an MBTiles (SQLite) container.
pub struct MbtilesStore {
    conn: Mutex<Connection>,
    metadata: TileMetadata,
    content_type: &'static str,
}

impl MbtilesStore {
    /// Opens the container read-only and loads its metadata eagerly,
    /// so the descriptor is fully available before the service
    /// advertises readiness.
    pub fn open(path: &Path) -> ServiceResult<Self> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        let metadata = read_metadata(&conn)?;
        info!(
            container = %path.display(),
            minzoom = metadata.minzoom,
            maxzoom = metadata.maxzoom,
            layer = metadata.source_layer_id(),
            "tile container opened"
        );
        Ok(Self {
            content_type: content_type_for(metadata.format.as_deref()),
            conn: Mutex::new(conn),
            metadata,
        })
    }
}

#[async_trait]
impl TileSource for MbtilesStore {
    fn metadata(&self) -> &TileMetadata {
        &self.metadata
    }

    async fn tile(&self, z: u8, x: u32, y: u32) -> ServiceResult<TilePayload> {
        // Coordinates outside any representable tile grid cannot be in
        // the container; answer NotFound without touching the store.
        if z > 30 || u64::from(x) >= 1 << z || u64::from(y) >= 1 << z {
            return Err(ServiceError::TileNotFound);
        }
        // Requests use the XYZ scheme; MBTiles rows are TMS.
        let row = (1u64 << z) - 1 - u64::from(y);

        let data: Option<Vec<u8>> = {
            let conn = self.conn.lock();
            let mut stmt = conn.prepare_cached(
                "SELECT tile_data FROM tiles \
                 WHERE zoom_level = ?1 AND tile_column = ?2 AND tile_row = ?3",
            )?;
            stmt.query_row(
                rusqlite::params![i64::from(z), i64::from(x), row as i64],
                |r| r.get(0),
            )
            .optional()?
        };

        let data = data.ok_or(ServiceError::TileNotFound)?;
        let content_encoding = sniff_encoding(&data);
        Ok(TilePayload {
            data: Bytes::from(data),
            content_type: self.content_type,
            content_encoding,
        })
    }
}

fn read_metadata(conn: &Connection) -> ServiceResult<TileMetadata> {
    let mut name = None;
    let mut format = None;
    let mut bounds = None;
    let mut center = None;
    let mut minzoom: Option<u8> = None;
    let mut maxzoom: Option<u8> = None;
    let mut attribution = None;
    let mut vector_layers = Vec::new();

    let mut stmt = conn.prepare("SELECT name, value FROM metadata")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;
    for row in rows {
        let (key, value) = row?;
        match key.as_str() {
            "name" => name = Some(value),
            "format" => format = Some(value),
            "bounds" => bounds = parse_floats(&value).try_into().ok(),
            "center" => center = Some(parse_floats(&value)),
            "minzoom" => minzoom = value.parse().ok(),
            "maxzoom" => maxzoom = value.parse().ok(),
            "attribution" => attribution = Some(value),
            "json" => {
                if let Ok(Value::Object(mut extras)) = serde_json::from_str(&value) {
                    if let Some(Value::Array(layers)) = extras.remove("vector_layers") {
                        vector_layers = layers;
                    }
                }
            }
            _ => {}
        }
    }

    // Containers are not required to declare their zoom range; scan the
    // tile index for it when absent.
    if minzoom.is_none() || maxzoom.is_none() {
        let (lo, hi): (Option<i64>, Option<i64>) = conn.query_row(
            "SELECT MIN(zoom_level), MAX(zoom_level) FROM tiles",
            [],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )?;
        minzoom = minzoom.or(lo.and_then(|v| u8::try_from(v).ok()));
        maxzoom = maxzoom.or(hi.and_then(|v| u8::try_from(v).ok()));
    }

    Ok(TileMetadata {
        name,
        format,
        bounds: bounds.unwrap_or(DEFAULT_BOUNDS),
        center,
        minzoom: minzoom.unwrap_or(0),
        maxzoom: maxzoom.unwrap_or(0),
        attribution,
        vector_layers,
    })
}

fn parse_floats(value: &str) -> Vec<f64> {
    value
        .split(',')
        .filter_map(|part| part.trim().parse().ok())
        .collect()
}

fn content_type_for(format: Option<&str>) -> &'static str {
    match format {
        Some("pbf") => "application/x-protobuf",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Tile blobs in MBTiles are commonly stored pre-compressed; the
/// transfer encoding is sniffed from the payload's magic bytes so the
/// response headers match what is actually in the container.
fn sniff_encoding(data: &[u8]) -> Option<&'static str> {
    match data {
        [0x1f, 0x8b, ..] => Some("gzip"),
        [0x78, 0x01, ..] | [0x78, 0x9c, ..] | [0x78, 0xda, ..] => Some("deflate"),
        _ => None,
    }
}
