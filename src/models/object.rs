//! Represents one generation of an object stored in the bucket.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata record for a single generation of a stored object.
///
/// A new record (with a fresh, strictly positive generation) is minted by
/// every successful whole-object write; the record never changes afterward.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Object {
    /// Object key (path-like identifier within the bucket).
    pub name: String,

    /// Generation assigned by the bucket. Strictly positive for any live
    /// object; `0` is reserved to mean "no prior generation".
    pub generation: i64,

    /// Size of this generation's contents in bytes.
    pub size: u64,

    /// MD5 checksum of the contents, when the store computed one.
    pub etag: Option<String>,

    /// When this generation was written.
    pub updated: DateTime<Utc>,
}
