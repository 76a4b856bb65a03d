//! The remote object store interface consumed by the proxy.
//!
//! The store offers whole-object sequential reads, whole-object replaces
//! with generation-based optimistic concurrency, and metadata lookups.
//! Dispatch is static per operation; each request is a strongly typed
//! struct.

use std::collections::VecDeque;
use std::io;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

use crate::errors::BucketError;
use crate::models::object::Object;

pub mod memory;

/// Chunked object contents, in upload order.
pub type ByteStream = BoxStream<'static, io::Result<Bytes>>;

/// Metadata lookup for the live object under a name.
#[derive(Clone, Debug)]
pub struct StatObjectRequest {
    pub name: String,
}

/// Sequential read of one specific generation of an object.
#[derive(Clone, Debug)]
pub struct ReadObjectRequest {
    pub name: String,
    pub generation: i64,
}

/// Whole-object write with an optional optimistic-concurrency precondition.
pub struct CreateObjectRequest {
    pub name: String,

    /// Full contents of the new generation.
    pub contents: ByteStream,

    /// `Some(0)` means the object must not exist; `Some(g)` means the live
    /// generation must be exactly `g`; `None` overwrites unconditionally.
    pub generation_precondition: Option<i64>,
}

/// Sequential reader over one generation's bytes.
///
/// Readers must be fully drained and then closed in a single scope. A close
/// failure is meaningful even after a successful drain and must be
/// propagated.
#[async_trait]
pub trait ObjectReader: Send {
    /// The next chunk of the object, or `None` at the end.
    async fn next_chunk(&mut self) -> io::Result<Option<Bytes>>;

    /// Release the reader, surfacing any deferred transport failure.
    async fn close(self: Box<Self>) -> io::Result<()>;
}

/// Remote store capability shared across proxies.
#[async_trait]
pub trait Bucket: Send + Sync {
    /// Look up the live object under `req.name`.
    async fn stat_object(&self, req: &StatObjectRequest) -> Result<Object, BucketError>;

    /// Open a reader over the named generation's contents.
    async fn new_reader(&self, req: &ReadObjectRequest)
        -> Result<Box<dyn ObjectReader>, BucketError>;

    /// Replace (or create) the object, minting a new generation.
    async fn create_object(&self, req: CreateObjectRequest) -> Result<Object, BucketError>;
}

/// A canned in-memory reader that always closes cleanly.
pub struct BytesReader {
    chunks: VecDeque<Bytes>,
}

impl BytesReader {
    /// Reader over a single contiguous buffer.
    pub fn new(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        let chunks = if data.is_empty() {
            VecDeque::new()
        } else {
            VecDeque::from([data])
        };
        Self { chunks }
    }

    /// Reader that yields the given chunks one at a time.
    pub fn from_chunks(chunks: impl IntoIterator<Item = Bytes>) -> Self {
        Self {
            chunks: chunks.into_iter().collect(),
        }
    }
}

#[async_trait]
impl ObjectReader for BytesReader {
    async fn next_chunk(&mut self) -> io::Result<Option<Bytes>> {
        Ok(self.chunks.pop_front())
    }

    async fn close(self: Box<Self>) -> io::Result<()> {
        Ok(())
    }
}
