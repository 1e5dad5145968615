//! Server configuration.

use clap::Parser;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default data directory (feature sources live at its top level).
pub const DEFAULT_DATA_DIR: &str = "data";

/// File name of the reassembled tile container.
pub const CONTAINER_FILE: &str = "parishes.mbtiles";

/// Command-line arguments for the server.
#[derive(Parser, Debug, Clone)]
#[command(name = "parishmap")]
#[command(about = "Vector tile container and church catalog server")]
#[command(version)]
pub struct Args {
    /// Host address to bind to.
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// HTTP port.
    #[arg(long, short = 'p', default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Data directory holding feature sources, chunk parts and the
    /// reassembled container.
    #[arg(long, default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    /// Path of the reassembled tile container
    /// (default: <data-dir>/tiles/parishes.mbtiles).
    #[arg(long)]
    pub container: Option<PathBuf>,

    /// Directory holding the container chunk files
    /// (default: <data-dir>/parts).
    #[arg(long)]
    pub parts_dir: Option<PathBuf>,

    /// Manifest listing chunk file names in concatenation order, one
    /// per line. Without it, chunks are discovered by scanning the
    /// parts directory in lexicographic order.
    #[arg(long)]
    pub parts_manifest: Option<PathBuf>,

    /// Feature source files, in concatenation order. Without it, every
    /// *.json at the top of the data directory is loaded in
    /// lexicographic order.
    #[arg(long = "feature-source")]
    pub feature_sources: Vec<PathBuf>,

    /// Enable debug logging.
    #[arg(long, short = 'd')]
    pub debug: bool,

    /// Enable silent mode (minimal logging).
    #[arg(long, short = 's')]
    pub silent: bool,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            container: None,
            parts_dir: None,
            parts_manifest: None,
            feature_sources: Vec::new(),
            debug: false,
            silent: false,
        }
    }
}

/// Server configuration derived from command-line arguments.
#[derive(Debug, Clone)]
pub struct Config {
    /// Host address to bind to.
    pub host: String,
    /// HTTP port.
    pub port: u16,
    /// Data directory.
    pub data_dir: PathBuf,
    /// Path of the reassembled tile container.
    pub container: PathBuf,
    /// Directory holding the container chunk files.
    pub parts_dir: PathBuf,
    /// Optional ordered chunk manifest.
    pub parts_manifest: Option<PathBuf>,
    /// Explicit ordered feature sources (empty = discover).
    pub feature_sources: Vec<PathBuf>,
    /// Enable debug logging.
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config::from(Args::default())
    }
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        let container = args
            .container
            .unwrap_or_else(|| args.data_dir.join("tiles").join(CONTAINER_FILE));
        let parts_dir = args.parts_dir.unwrap_or_else(|| args.data_dir.join("parts"));
        Self {
            host: args.host,
            port: args.port,
            data_dir: args.data_dir,
            container,
            parts_dir,
            parts_manifest: args.parts_manifest,
            feature_sources: args.feature_sources,
            debug: args.debug,
        }
    }
}

impl Config {
    /// Returns the bind address for the HTTP service.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the ordered chunk list for container reassembly.
    ///
    /// With a manifest the declared sequence is used verbatim, missing
    /// entries included (the reassembler skips them with a warning).
    /// Otherwise the parts directory is scanned for
    /// `<container>.part.*` files; lexicographic name order matches the
    /// `split(1)` suffix scheme the dataset is shipped with.
    pub fn chunk_paths(&self) -> io::Result<Vec<PathBuf>> {
        if let Some(manifest) = &self.parts_manifest {
            let listing = fs::read_to_string(manifest)?;
            return Ok(listing
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(|line| resolve(&self.parts_dir, line))
                .collect());
        }

        let container_name = self
            .container
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| CONTAINER_FILE.to_string());
        let prefix = format!("{container_name}.part.");

        let mut parts = Vec::new();
        let entries = match fs::read_dir(&self.parts_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(parts),
            Err(e) => return Err(e),
        };
        for entry in entries {
            let entry = entry?;
            if entry.file_name().to_string_lossy().starts_with(&prefix) {
                parts.push(entry.path());
            }
        }
        parts.sort();
        Ok(parts)
    }

    /// Returns the ordered feature source list.
    ///
    /// Explicit sources are used as declared; otherwise the data
    /// directory's top-level `*.json` files in lexicographic order.
    /// The order is the corpus concatenation order and therefore the
    /// stable key for unfiltered pagination.
    pub fn feature_paths(&self) -> io::Result<Vec<PathBuf>> {
        if !self.feature_sources.is_empty() {
            return Ok(self.feature_sources.clone());
        }

        let mut sources = Vec::new();
        let entries = match fs::read_dir(&self.data_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(sources),
            Err(e) => return Err(e),
        };
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                sources.push(path);
            }
        }
        sources.sort();
        Ok(sources)
    }
}

fn resolve(base: &Path, entry: &str) -> PathBuf {
    let path = Path::new(entry);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
