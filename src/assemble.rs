//! Chunk reassembly for the tile container.
//!
//! The dataset ships as an ordered sequence of binary chunks
//! (`parishes.mbtiles.part.aa`, `.ab`, ...). Before serving, the
//! chunks are concatenated back into a single container file, exactly
//! once per process lifetime.

use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{info, warn};

use crate::error::{ServiceError, ServiceResult};

/// Outcome of a reassembly run.
#[derive(Debug, PartialEq, Eq)]
pub enum Assembly {
    /// The destination already existed; no chunk I/O was performed.
    AlreadyPresent,
    /// Every declared chunk was written.
    Complete { parts: usize, bytes: u64 },
    /// Some declared chunks were missing and skipped. The container's
    /// coordinate coverage is a subset of the advertised metadata.
    Partial {
        written: usize,
        missing: Vec<PathBuf>,
        bytes: u64,
    },
}

/// Concatenates `parts`, in declared order, into `dest`.
///
/// Idempotence is a hard contract: if `dest` already exists the call
/// is a no-op. Re-running the concatenation against a container that
/// may already be serving reads would corrupt in-flight lookups.
///
/// Chunks are streamed into a temporary sibling file which is renamed
/// over `dest` only after the final chunk is fully written, so no
/// partially written container is ever left under the callable path.
/// A missing chunk is skipped with a warning (best-effort reassembly);
/// any read or write I/O error aborts the whole operation, removes the
/// temporary file and surfaces the cause.
pub async fn reassemble(parts: &[PathBuf], dest: &Path) -> ServiceResult<Assembly> {
    if fs::try_exists(dest).await? {
        info!(container = %dest.display(), "container already assembled, skipping");
        return Ok(Assembly::AlreadyPresent);
    }

    if parts.is_empty() {
        return Err(ServiceError::NoChunks(
            dest.parent().unwrap_or(Path::new(".")).to_path_buf(),
        ));
    }

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).await?;
    }

    let staging = staging_path(dest);
    match write_chunks(parts, &staging).await {
        Ok((written, missing, bytes)) => {
            fs::rename(&staging, dest).await?;
            if missing.is_empty() {
                info!(parts = written, bytes, container = %dest.display(), "container reassembled");
                Ok(Assembly::Complete { parts: written, bytes })
            } else {
                warn!(
                    written,
                    skipped = missing.len(),
                    "container reassembled with missing chunks; tile coverage is partial"
                );
                Ok(Assembly::Partial { written, missing, bytes })
            }
        }
        Err(e) => {
            // Best-effort cleanup; the staging file is invalid anyway.
            let _ = fs::remove_file(&staging).await;
            Err(e.into())
        }
    }
}

async fn write_chunks(
    parts: &[PathBuf],
    staging: &Path,
) -> std::io::Result<(usize, Vec<PathBuf>, u64)> {
    let mut out = BufWriter::new(fs::File::create(staging).await?);
    let mut written = 0usize;
    let mut missing = Vec::new();
    let mut bytes = 0u64;

    // Strictly sequential: chunk n+1 must not begin before chunk n has
    // been fully written, or the container's byte layout breaks.
    for part in parts {
        if !fs::try_exists(part).await? {
            warn!(chunk = %part.display(), "chunk missing, skipping");
            missing.push(part.clone());
            continue;
        }
        let mut input = fs::File::open(part).await?;
        bytes += tokio::io::copy(&mut input, &mut out).await?;
        written += 1;
    }

    out.flush().await?;
    Ok((written, missing, bytes))
}

fn staging_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".incomplete");
    dest.with_file_name(name)
}
