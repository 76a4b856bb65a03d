//! src/services/object_proxy.rs
//!
//! ObjectProxy — a mutable, random-access local view over one immutable
//! generation of a remote object. The store only supports whole-object
//! reads and whole-object replaces guarded by a generation precondition, so
//! the proxy copies the source into a local scratch file on first use,
//! applies mutations there, and publishes the whole scratch as a new
//! generation on `sync`.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use futures::stream;
use tracing::debug;

use crate::bucket::{
    Bucket, ByteStream, CreateObjectRequest, ObjectReader, ReadObjectRequest, StatObjectRequest,
};
use crate::config::ScratchConfig;
use crate::errors::{BucketError, ProxyError};
use crate::services::scratch::ScratchFile;

pub type ProxyResult<T> = Result<T, ProxyError>;

/// Result of an [`ObjectProxy::stat`] call.
#[derive(Clone, Copy, Debug)]
pub struct StatResult {
    /// Size of the caller's view, including unpublished local edits.
    pub size: u64,

    /// Whether the remote object has drifted from the source generation, in
    /// which case a future sync would be rejected or would overwrite newer
    /// remote state.
    pub clobbered: bool,
}

/// A mutable fork of one generation of a remote object.
///
/// A proxy is single-owner: all mutating operations take `&mut self`, and
/// callers wrapping it in a shared layer are responsible for mutual
/// exclusion per instance. Distinct proxies are independent and may share
/// one [`Bucket`].
///
/// Dropping an in-flight operation is safe: a half-materialized scratch is
/// discarded and unlinked, and an interrupted `sync` leaves the proxy dirty
/// so the next call retries.
pub struct ObjectProxy {
    bucket: Arc<dyn Bucket>,
    name: String,

    /// Generation this proxy is branched from; `0` means no source object
    /// exists yet, so publication requires absence.
    source_generation: i64,

    /// Size of the source as known at construction; answers `stat` until
    /// the scratch exists.
    source_size: u64,

    /// Local mutable copy of the source. Present iff materialized; serves
    /// every read and write once present, including after a sync.
    local: Option<ScratchFile>,

    /// Whether the scratch diverges from the source generation.
    dirty: bool,

    scratch_dir: PathBuf,
}

impl ObjectProxy {
    /// Create a proxy branched from generation `source_generation` of
    /// `name`, which had size `source_size`. Pass `source_generation == 0`
    /// (and a zero size) when no source object exists yet.
    pub fn new(
        bucket: Arc<dyn Bucket>,
        name: impl Into<String>,
        source_generation: i64,
        source_size: u64,
        config: &ScratchConfig,
    ) -> ProxyResult<Self> {
        if source_generation < 0 {
            return Err(ProxyError::InvalidSource(format!(
                "generation {} is negative",
                source_generation
            )));
        }
        if source_generation == 0 && source_size != 0 {
            return Err(ProxyError::InvalidSource(format!(
                "no source object, but a source size of {}",
                source_size
            )));
        }
        Ok(Self {
            bucket,
            name: name.into(),
            source_generation,
            source_size,
            local: None,
            dirty: false,
            scratch_dir: config.scratch_dir().to_path_buf(),
        })
    }

    /// The object key this proxy fronts.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Report the caller's view of the object alongside a remote-drift
    /// signal.
    ///
    /// The returned size always reflects pending local edits. `clobbered`
    /// is set when the bucket's live generation differs from the source
    /// generation, or when the object is gone even though this proxy was
    /// branched from a real generation. A failed stat never mutates the
    /// proxy.
    pub async fn stat(&self) -> ProxyResult<StatResult> {
        let req = StatObjectRequest {
            name: self.name.clone(),
        };
        let clobbered = match self.bucket.stat_object(&req).await {
            Ok(record) => record.generation != self.source_generation,
            Err(BucketError::NotFound(_)) => self.source_generation != 0,
            Err(err) => return Err(ProxyError::Stat(err)),
        };
        Ok(StatResult {
            size: self.effective_size(),
            clobbered,
        })
    }

    /// Copy bytes at `offset` into `buf`, materializing the source first.
    ///
    /// Returns the count copied; fewer bytes than `buf.len()` (possibly 0)
    /// means the read crossed the end of the data. Zero-length reads still
    /// materialize, so callers can use one to warm the proxy up.
    pub async fn read_at(&mut self, buf: &mut [u8], offset: u64) -> ProxyResult<usize> {
        if self.source_generation == 0 && self.local.is_none() {
            // Nothing has been written and there is no source to fetch.
            return Ok(0);
        }
        let scratch = self.ensure_materialized().await?;
        scratch.read_at(buf, offset).await.map_err(ProxyError::Scratch)
    }

    /// Overwrite bytes at `offset`, extending the object (zero fill) when
    /// the range reaches past the current end. Partial writes do not occur
    /// at this layer: success means all of `buf` was applied.
    pub async fn write_at(&mut self, buf: &[u8], offset: u64) -> ProxyResult<usize> {
        let scratch = self.ensure_materialized().await?;
        let written = scratch.write_at(buf, offset).await.map_err(ProxyError::Scratch)?;
        self.dirty = true;
        Ok(written)
    }

    /// Set the object's size to exactly `size`; growing zero-fills and
    /// shrinking drops bytes. Always leaves the proxy dirty.
    pub async fn truncate(&mut self, size: u64) -> ProxyResult<()> {
        let scratch = self.ensure_materialized().await?;
        scratch.truncate(size).await.map_err(ProxyError::Scratch)?;
        self.dirty = true;
        Ok(())
    }

    /// Publish the local contents as a new generation, guarded by a
    /// precondition on the source generation.
    ///
    /// When a source generation exists and nothing has changed, this is a
    /// no-op returning that generation without touching the bucket. A proxy
    /// with no source object always publishes, even untouched: the caller
    /// asked for the object to exist. On success the proxy re-baselines on
    /// the new generation and a repeat call is a no-op. On any failure,
    /// precondition or otherwise, the proxy stays dirty and the next call
    /// makes a fresh attempt.
    pub async fn sync(&mut self) -> ProxyResult<i64> {
        if !self.dirty && self.source_generation != 0 {
            return Ok(self.source_generation);
        }

        let contents = {
            let scratch = self.ensure_materialized().await?;
            scratch.read_all().await.map_err(ProxyError::Scratch)?
        };
        let size = contents.len() as u64;
        let chunks: Vec<io::Result<Bytes>> = vec![Ok(Bytes::from(contents))];
        let body: ByteStream = Box::pin(stream::iter(chunks));

        let record = self
            .bucket
            .create_object(CreateObjectRequest {
                name: self.name.clone(),
                contents: body,
                generation_precondition: Some(self.source_generation),
            })
            .await
            .map_err(ProxyError::Create)?;

        if record.generation <= 0 {
            return Err(ProxyError::InvalidGeneration(record.generation));
        }

        debug!(name = %self.name, generation = record.generation, size, "published new generation");
        self.source_generation = record.generation;
        self.source_size = size;
        self.dirty = false;
        Ok(record.generation)
    }

    /// Panic if the proxy's internal state is inconsistent.
    ///
    /// This is an assertion mechanism for catching logic errors, not a
    /// recoverable check; the test suite calls it around every public
    /// operation.
    pub fn check_invariants(&self) {
        assert!(
            self.source_generation >= 0,
            "source generation {} is negative",
            self.source_generation
        );
        if self.dirty {
            assert!(self.local.is_some(), "dirty proxy has no scratch file");
        }
        if self.source_generation == 0 {
            assert_eq!(
                self.source_size, 0,
                "no source object, but a source size of {}",
                self.source_size
            );
        }
    }

    /// The size of the caller's view: the scratch size once materialized,
    /// the advisory source size before that.
    fn effective_size(&self) -> u64 {
        match &self.local {
            Some(scratch) => scratch.size(),
            None => self.source_size,
        }
    }

    /// Idempotently bring the scratch file into existence, byte-equal to
    /// the source generation (or empty when there is none).
    async fn ensure_materialized(&mut self) -> ProxyResult<&mut ScratchFile> {
        if self.local.is_none() {
            let scratch = self.materialize().await?;
            self.local = Some(scratch);
        }
        Ok(self.local.as_mut().expect("scratch installed above"))
    }

    /// Build a scratch file holding the source generation's full contents.
    ///
    /// The handle is returned rather than installed so that a failure (or a
    /// caller dropping the future mid-copy) leaves the proxy
    /// un-materialized, with the partial file unlinked, and the next
    /// operation retries cleanly.
    async fn materialize(&self) -> ProxyResult<ScratchFile> {
        let mut scratch = ScratchFile::create(&self.scratch_dir)
            .await
            .map_err(ProxyError::Scratch)?;
        if self.source_generation == 0 {
            return Ok(scratch);
        }

        let req = ReadObjectRequest {
            name: self.name.clone(),
            generation: self.source_generation,
        };
        let mut reader = self
            .bucket
            .new_reader(&req)
            .await
            .map_err(ProxyError::NewReader)?;

        // Drain fully, then close; the reader is released on every path and
        // a close failure is meaningful even after a clean copy.
        let copied = copy_into(reader.as_mut(), &mut scratch).await;
        let closed = reader.close().await;
        let copied = copied.map_err(ProxyError::Copy)?;
        closed.map_err(ProxyError::Close)?;

        debug!(
            name = %self.name,
            generation = self.source_generation,
            bytes = copied,
            "materialized source object"
        );
        Ok(scratch)
    }
}

/// Sequentially append the reader's chunks to the scratch, returning the
/// byte count transferred.
async fn copy_into(reader: &mut dyn ObjectReader, scratch: &mut ScratchFile) -> io::Result<u64> {
    let mut copied = 0u64;
    while let Some(chunk) = reader.next_chunk().await? {
        scratch.append(&chunk).await?;
        copied += chunk.len() as u64;
    }
    Ok(copied)
}
