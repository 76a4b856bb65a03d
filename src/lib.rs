//! Random-access mutable views over immutable object-store generations.
//!
//! A content-addressed store offers whole-object sequential reads and
//! whole-object replaces with generation-based optimistic concurrency.
//! [`ObjectProxy`] bridges that model to POSIX-style `read_at` /
//! `write_at` / `truncate`: it lazily copies one source generation into a
//! local scratch file, serves random access from there, and publishes the
//! accumulated edits as a new generation on [`ObjectProxy::sync`].
//! Concurrent remote updates surface as a clobber signal from
//! [`ObjectProxy::stat`] and as a distinguishable precondition error from
//! `sync`.
//!
//! The store itself is abstracted behind the [`Bucket`] trait;
//! [`MemoryBucket`] is an in-process implementation for tests and local
//! use.

pub mod bucket;
pub mod config;
pub mod errors;
pub mod models;
pub mod services;

pub use bucket::memory::MemoryBucket;
pub use bucket::{
    Bucket, ByteStream, BytesReader, CreateObjectRequest, ObjectReader, ReadObjectRequest,
    StatObjectRequest,
};
pub use config::ScratchConfig;
pub use errors::{BucketError, ProxyError};
pub use models::object::Object;
pub use services::object_proxy::{ObjectProxy, ProxyResult, StatResult};
