//! Content digests and hash-gated file pushes.

use std::io;
use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::debug;

/// Hex sha256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Write `contents` to `path` only when it differs from what is there.
///
/// Returns whether a write happened. Parent directories are created as
/// needed; on error the previously-written file is left untouched.
pub fn write_if_changed(path: &Path, contents: &str) -> io::Result<bool> {
    if let Ok(existing) = std::fs::read(path)
        && sha256_hex(&existing) == sha256_hex(contents.as_bytes())
    {
        debug!(path = %path.display(), "content unchanged, skipping write");
        return Ok(false);
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents)?;
    debug!(path = %path.display(), bytes = contents.len(), "wrote file");
    Ok(true)
}
