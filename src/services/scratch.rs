//! Per-proxy scratch file: a random-access byte container with an explicit
//! size, backed by a uniquely named file that is unlinked on drop.
//!
//! Gaps created by writes or truncation past the end read back as zeros;
//! whether the filesystem stores real zeros or holes is not observable.

use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tracing::debug;
use uuid::Uuid;

pub(crate) struct ScratchFile {
    file: File,
    path: PathBuf,
    size: u64,
}

impl ScratchFile {
    /// Create an empty scratch file under `dir`.
    pub(crate) async fn create(dir: &Path) -> io::Result<Self> {
        let path = dir.join(format!(".proxy-{}", Uuid::new_v4()));
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;
        Ok(Self {
            file,
            path,
            size: 0,
        })
    }

    pub(crate) fn size(&self) -> u64 {
        self.size
    }

    /// Copy bytes from `offset` into `buf`. Returns the count copied, which
    /// is short (possibly 0) when the range crosses the end of the scratch.
    pub(crate) async fn read_at(&mut self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        if offset >= self.size || buf.is_empty() {
            return Ok(0);
        }
        let want = buf.len().min((self.size - offset) as usize);
        self.file.seek(SeekFrom::Start(offset)).await?;
        self.file.read_exact(&mut buf[..want]).await?;
        Ok(want)
    }

    /// Overwrite bytes at `offset`, first growing the file (zero fill) when
    /// `offset + buf.len()` reaches past the current end. The growth applies
    /// regardless of `buf.len()`, so a zero-length write past the end still
    /// extends the file.
    pub(crate) async fn write_at(&mut self, buf: &[u8], offset: u64) -> io::Result<usize> {
        let end = offset + buf.len() as u64;
        if end > self.size {
            self.file.set_len(end).await?;
            self.size = end;
        }
        if buf.is_empty() {
            return Ok(0);
        }
        self.file.seek(SeekFrom::Start(offset)).await?;
        self.file.write_all(buf).await?;
        Ok(buf.len())
    }

    /// Sequential fill used while materializing a source object.
    pub(crate) async fn append(&mut self, chunk: &[u8]) -> io::Result<()> {
        let at = self.size;
        self.write_at(chunk, at).await?;
        Ok(())
    }

    /// Set the size to exactly `size`; growing zero-fills, shrinking drops.
    pub(crate) async fn truncate(&mut self, size: u64) -> io::Result<()> {
        self.file.set_len(size).await?;
        self.size = size;
        Ok(())
    }

    /// The full contents, for whole-object publication.
    pub(crate) async fn read_all(&mut self) -> io::Result<Vec<u8>> {
        let mut contents = vec![0u8; self.size as usize];
        let copied = self.read_at(&mut contents, 0).await?;
        contents.truncate(copied);
        Ok(contents)
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if let Err(err) = std::fs::remove_file(&self.path) {
            debug!("failed to remove scratch file {}: {}", self.path.display(), err);
        }
    }
}
