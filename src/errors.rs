//! Error taxonomy for the proxy and the bucket interface it consumes.
//!
//! Kinds are modeled as tagged sums so callers can branch on them; the
//! precondition kind in particular must stay distinguishable from generic
//! transport failures across the proxy boundary.

use std::io;

use thiserror::Error;

/// Errors produced by a [`Bucket`](crate::bucket::Bucket) implementation.
#[derive(Debug, Error)]
pub enum BucketError {
    /// No live object (or no matching generation) under the requested name.
    #[error("object `{0}` not found")]
    NotFound(String),

    /// A `create_object` generation precondition was not satisfied.
    #[error("{0}")]
    Precondition(String),

    /// The object name was rejected before any storage work happened.
    #[error("invalid object name: {0}")]
    InvalidName(String),

    #[error(transparent)]
    Io(#[from] io::Error),

    /// Any other failure talking to the store.
    #[error("{0}")]
    Transport(String),
}

impl BucketError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, BucketError::NotFound(_))
    }

    pub fn is_precondition(&self) -> bool {
        matches!(self, BucketError::Precondition(_))
    }
}

/// Errors surfaced by [`ObjectProxy`](crate::services::object_proxy::ObjectProxy)
/// operations.
///
/// Each bucket- or I/O-backed variant carries the name of the failing
/// operation in its message; the underlying cause is preserved as the
/// `source`. Substring checks in tests are a convenience; the variant is
/// the contract.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Construction rejected the source parameters.
    #[error("invalid source object: {0}")]
    InvalidSource(String),

    #[error("StatObject: {0}")]
    Stat(#[source] BucketError),

    #[error("NewReader: {0}")]
    NewReader(#[source] BucketError),

    /// Draining the source reader into the scratch file failed.
    #[error("Copy: {0}")]
    Copy(#[source] io::Error),

    /// Closing the source reader failed; surfaced even after a clean copy.
    #[error("Close: {0}")]
    Close(#[source] io::Error),

    #[error("CreateObject: {0}")]
    Create(#[source] BucketError),

    /// The store claimed success but handed back a non-positive generation.
    #[error("CreateObject: invalid generation {0}")]
    InvalidGeneration(i64),

    /// Local scratch file I/O failed.
    #[error("scratch file: {0}")]
    Scratch(#[source] io::Error),
}

impl ProxyError {
    /// True iff a sync was rejected because the generation precondition no
    /// longer held.
    pub fn is_precondition(&self) -> bool {
        matches!(self, ProxyError::Create(cause) if cause.is_precondition())
    }

    /// True iff the underlying bucket reported the object missing.
    pub fn is_not_found(&self) -> bool {
        match self {
            ProxyError::Stat(cause) | ProxyError::NewReader(cause) | ProxyError::Create(cause) => {
                cause.is_not_found()
            }
            _ => false,
        }
    }
}
