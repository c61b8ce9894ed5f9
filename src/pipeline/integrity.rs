//! Pre-publish artifact checks.
//!
//! The orchestrator verifies the staged `.part` file, never the published
//! target. A file only passes if it starts with the PDF magic and is at
//! least `floor` bytes. Rejected files are deleted, so the previous
//! artifact (if any) stays in place and a later `--missing` run retries.

use std::path::Path;

use tokio::io::AsyncReadExt;

use super::error::IntegrityError;

const PDF_MAGIC: &[u8] = b"%PDF";

/// Returns the verified size in bytes.
pub async fn verify_artifact(path: &Path, floor: u64) -> Result<u64, IntegrityError> {
    let shown = path.display().to_string();
    let meta = tokio::fs::metadata(path)
        .await
        .map_err(|_| IntegrityError::Missing {
            path: shown.clone(),
        })?;
    if !meta.is_file() {
        return Err(IntegrityError::Missing { path: shown });
    }

    let size = meta.len();
    if size < floor {
        discard(path).await;
        return Err(IntegrityError::TooSmall {
            path: shown,
            size,
            floor,
        });
    }

    let mut head = [0u8; 4];
    let read = match tokio::fs::File::open(path).await {
        Ok(mut f) => f.read(&mut head).await.unwrap_or(0),
        Err(_) => 0,
    };
    if &head[..read] != PDF_MAGIC {
        discard(path).await;
        return Err(IntegrityError::NotPdf { path: shown });
    }

    Ok(size)
}

async fn discard(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        tracing::warn!(path = %path.display(), error = %e, "Could not remove rejected artifact");
    }
}
