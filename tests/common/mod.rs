//! Common test utilities.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::net::TcpListener;

use parishmap::{build_app, Config, MapServer};

/// Test server wrapper: a full service started against a generated
/// dataset (an MBTiles container shipped as split parts, plus two
/// GeoJSON feature sources).
pub struct TestServer {
    pub base_url: String,
    _data: TempDir,
}

impl TestServer {
    /// Generates fixture data, runs the start-up sequence and serves
    /// on a random port.
    pub async fn start() -> Self {
        let data = TempDir::new().unwrap();
        write_feature_sources(data.path());
        write_container_parts(data.path());

        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 0,
            data_dir: data.path().to_path_buf(),
            container: data.path().join("tiles").join("parishes.mbtiles"),
            parts_dir: data.path().join("parts"),
            parts_manifest: None,
            feature_sources: Vec::new(),
            debug: false,
        };

        let server = MapServer::new(config);
        let state = server.initialize().await.unwrap();
        let app = build_app(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            _data: data,
        }
    }

    /// Returns a full URL for the given path.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn feature(title: &str, country: &str, kind: &str, rite: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "Feature",
        "geometry": { "type": "Point", "coordinates": [12.45, 41.9] },
        "properties": {
            "Title": title,
            "Country": country,
            "Type": kind,
            "Rite": rite
        }
    })
}

/// Two sources; concatenation order is lexicographic (a before b).
fn write_feature_sources(dir: &Path) {
    let a = serde_json::json!({
        "type": "FeatureCollection",
        "features": [
            feature("A Church", "Kenya", "parish", "Roman"),
            feature("B Shrine", "Kenya", "shrine", "Roman"),
        ]
    });
    let b = serde_json::json!({
        "type": "FeatureCollection",
        "features": [
            feature("C Basilica", "Italy", "basilica", "Roman"),
            feature("St. Mary's Cathedral", "Italy", "cathedral", "Latin"),
        ]
    });
    fs::write(dir.join("a.json"), a.to_string()).unwrap();
    fs::write(dir.join("b.json"), b.to_string()).unwrap();
}

/// Builds an MBTiles container and ships it as three ordered parts;
/// the container itself is left for the server to reassemble.
fn write_container_parts(dir: &Path) {
    let built = dir.join("built.mbtiles");
    build_mbtiles(&built);

    let bytes = fs::read(&built).unwrap();
    fs::remove_file(&built).unwrap();

    let parts_dir = dir.join("parts");
    fs::create_dir_all(&parts_dir).unwrap();
    let cut = bytes.len() / 3;
    let pieces: [(&str, &[u8]); 3] = [
        ("aa", &bytes[..cut]),
        ("ab", &bytes[cut..2 * cut]),
        ("ac", &bytes[2 * cut..]),
    ];
    for (suffix, data) in pieces {
        fs::write(parts_dir.join(format!("parishes.mbtiles.part.{suffix}")), data).unwrap();
    }
}

fn build_mbtiles(path: &PathBuf) {
    let conn = rusqlite::Connection::open(path).unwrap();
    conn.execute_batch(
        "CREATE TABLE metadata (name TEXT, value TEXT); \
         CREATE TABLE tiles (zoom_level INTEGER, tile_column INTEGER, \
         tile_row INTEGER, tile_data BLOB);",
    )
    .unwrap();

    let metadata = [
        ("name", "Parishes of the World"),
        ("format", "pbf"),
        ("bounds", "-180,-85.0511,180,85.0511"),
        ("minzoom", "0"),
        ("maxzoom", "2"),
        ("attribution", "© Parish Map"),
        ("json", r#"{"vector_layers":[{"id":"parishes","fields":{}}]}"#),
    ];
    for (key, value) in metadata {
        conn.execute(
            "INSERT INTO metadata VALUES (?1, ?2)",
            rusqlite::params![key, value],
        )
        .unwrap();
    }

    // XYZ (0,0,0) uncompressed, XYZ (2,1,1) with a gzip magic prefix.
    let tiles: [(i64, i64, i64, &[u8]); 2] = [
        (0, 0, 0, b"root-tile"),
        (2, 1, (1 << 2) - 1 - 1, b"\x1f\x8b\x08zoomed-tile"),
    ];
    for (z, x, row, data) in tiles {
        conn.execute(
            "INSERT INTO tiles VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![z, x, row, data],
        )
        .unwrap();
    }
}
