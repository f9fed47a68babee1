//! Template for self-initializing HTML documents.
//!
//! Any HTML path that does not exist yet is created from these bytes before
//! the request reaches the WebDAV handler.

use std::io::ErrorKind;
use std::path::Path;

use bytes::Bytes;
use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{info, warn};

/// Document bytes shipped with the binary.
const BUNDLED_DOCUMENT: &[u8] = include_bytes!("empty.html");

/// Initial content for newly materialized documents.
///
/// Cloning is cheap; the bytes are shared.
#[derive(Debug, Clone)]
pub struct DocumentTemplate {
    bytes: Bytes,
}

impl DocumentTemplate {
    /// The template embedded in the binary.
    pub fn bundled() -> Self {
        Self::from_static(BUNDLED_DOCUMENT)
    }

    pub fn from_static(bytes: &'static [u8]) -> Self {
        Self {
            bytes: Bytes::from_static(bytes),
        }
    }

    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// Read a replacement template from disk.
    pub async fn from_file(path: &Path) -> std::io::Result<Self> {
        let bytes = fs::read(path).await?;
        Ok(Self::from_bytes(bytes))
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// Create `path` from the template unless it already exists.
    ///
    /// The file is created exclusively with owner read/write permissions.
    /// Returns `true` if this call created the file.
    pub async fn materialize(&self, path: &Path) -> std::io::Result<bool> {
        if fs::try_exists(path).await? {
            return Ok(false);
        }

        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        options.mode(0o600);

        let file = match options.open(path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => return Err(e),
        };

        info!(path = %path.display(), "creating document");
        write_or_remove(path, file, &self.bytes).await?;

        Ok(true)
    }
}

/// Write `bytes` to a freshly created `path`, removing it again on failure so
/// a partial document never blocks the next attempt.
async fn write_or_remove<W>(path: &Path, mut writer: W, bytes: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let written = async {
        writer.write_all(bytes).await?;
        writer.flush().await
    }
    .await;

    if let Err(e) = written {
        drop(writer);
        if let Err(remove_err) = fs::remove_file(path).await {
            warn!(path = %path.display(), error = %remove_err, "failed to remove partial document");
        }
        return Err(e);
    }

    Ok(())
}

impl Default for DocumentTemplate {
    fn default() -> Self {
        Self::bundled()
    }
}
