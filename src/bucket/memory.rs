//! In-memory [`Bucket`] implementation.
//!
//! Keeps every live object (metadata plus contents) in a mutex-guarded map
//! and mints monotonically increasing generations. Useful for consumers'
//! unit tests and for exercising proxies without a remote store; it
//! enforces the same precondition semantics a real store would.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use futures::StreamExt;
use tracing::debug;

use crate::bucket::{
    Bucket, BytesReader, CreateObjectRequest, ObjectReader, ReadObjectRequest, StatObjectRequest,
};
use crate::errors::BucketError;
use crate::models::object::Object;

const MAX_OBJECT_NAME_LEN: usize = 1024;

/// One live object: its metadata record plus payload.
struct StoredObject {
    record: Object,
    contents: Bytes,
}

struct MemoryState {
    objects: HashMap<String, StoredObject>,
    next_generation: i64,
}

/// Generation-aware in-memory object store.
pub struct MemoryBucket {
    state: Mutex<MemoryState>,
}

impl MemoryBucket {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState {
                objects: HashMap::new(),
                next_generation: 1,
            }),
        }
    }

    /// The live generation for `name`, or 0 when no object exists.
    pub fn generation(&self, name: &str) -> i64 {
        self.state()
            .objects
            .get(name)
            .map(|stored| stored.record.generation)
            .unwrap_or(0)
    }

    /// The live contents for `name`, if any.
    pub fn contents(&self, name: &str) -> Option<Bytes> {
        self.state()
            .objects
            .get(name)
            .map(|stored| stored.contents.clone())
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().expect("bucket state lock poisoned")
    }
}

impl Default for MemoryBucket {
    fn default() -> Self {
        Self::new()
    }
}

/// Reject names that could not round-trip through a real store.
fn ensure_name_safe(name: &str) -> Result<(), BucketError> {
    if name.is_empty() {
        return Err(BucketError::InvalidName("must not be empty".into()));
    }
    if name.len() > MAX_OBJECT_NAME_LEN {
        return Err(BucketError::InvalidName(format!(
            "must be at most {} bytes",
            MAX_OBJECT_NAME_LEN
        )));
    }
    if name.bytes().any(|b| b == b'\0') {
        return Err(BucketError::InvalidName("must not contain NUL bytes".into()));
    }
    Ok(())
}

#[async_trait]
impl Bucket for MemoryBucket {
    async fn stat_object(&self, req: &StatObjectRequest) -> Result<Object, BucketError> {
        self.state()
            .objects
            .get(&req.name)
            .map(|stored| stored.record.clone())
            .ok_or_else(|| BucketError::NotFound(req.name.clone()))
    }

    async fn new_reader(
        &self,
        req: &ReadObjectRequest,
    ) -> Result<Box<dyn ObjectReader>, BucketError> {
        let state = self.state();
        match state.objects.get(&req.name) {
            Some(stored) if stored.record.generation == req.generation => {
                Ok(Box::new(BytesReader::new(stored.contents.clone())))
            }
            _ => Err(BucketError::NotFound(format!(
                "{}#{}",
                req.name, req.generation
            ))),
        }
    }

    async fn create_object(&self, req: CreateObjectRequest) -> Result<Object, BucketError> {
        ensure_name_safe(&req.name)?;

        // Drain the contents before taking the lock; the stream may suspend.
        let mut contents = Vec::new();
        let mut digest = md5::Context::new();
        let mut stream = req.contents;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            digest.consume(&chunk);
            contents.extend_from_slice(&chunk);
        }

        let mut state = self.state();
        let live = state
            .objects
            .get(&req.name)
            .map(|stored| stored.record.generation)
            .unwrap_or(0);
        if let Some(required) = req.generation_precondition {
            if live != required {
                return Err(BucketError::Precondition(format!(
                    "object `{}` is at generation {}, required {}",
                    req.name, live, required
                )));
            }
        }

        let generation = state.next_generation;
        state.next_generation += 1;
        let record = Object {
            name: req.name.clone(),
            generation,
            size: contents.len() as u64,
            etag: Some(format!("{:x}", digest.compute())),
            updated: Utc::now(),
        };
        debug!(name = %req.name, generation, size = record.size, "stored object");
        state.objects.insert(
            req.name,
            StoredObject {
                record: record.clone(),
                contents: Bytes::from(contents),
            },
        );
        Ok(record)
    }
}
