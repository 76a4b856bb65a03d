//! End-to-end proxy scenarios over the in-memory bucket.
//!
//! Unlike the scripted suite, nothing is canned here: the bucket assigns
//! real generations and enforces real preconditions, so these tests cover
//! the full edit-publish-drift lifecycle.

use std::io;
use std::sync::{Arc, Once};

use anyhow::Result;
use bytes::Bytes;
use futures::stream;
use object_proxy::{
    Bucket, CreateObjectRequest, MemoryBucket, Object, ObjectProxy, ScratchConfig,
};
use tracing_subscriber::EnvFilter;

const OBJECT_NAME: &str = "some/object";

/// Opt-in logging for debugging a failing scenario: RUST_LOG=debug.
fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .try_init();
    });
}

struct Fixture {
    bucket: Arc<MemoryBucket>,
    config: ScratchConfig,
    _scratch: tempfile::TempDir,
}

async fn fixture() -> Result<Fixture> {
    init_tracing();
    let scratch = tempfile::tempdir()?;
    let config = ScratchConfig::with_dir(scratch.path()).await?;
    Ok(Fixture {
        bucket: Arc::new(MemoryBucket::new()),
        config,
        _scratch: scratch,
    })
}

impl Fixture {
    fn proxy(&self, source_generation: i64, source_size: u64) -> Result<ObjectProxy> {
        Ok(ObjectProxy::new(
            self.bucket.clone(),
            OBJECT_NAME,
            source_generation,
            source_size,
            &self.config,
        )?)
    }

    /// Write `data` straight into the bucket, unconditionally.
    async fn seed(&self, data: &str) -> Result<Object> {
        let chunks: Vec<io::Result<Bytes>> = vec![Ok(Bytes::copy_from_slice(data.as_bytes()))];
        let record = self
            .bucket
            .create_object(CreateObjectRequest {
                name: OBJECT_NAME.into(),
                contents: Box::pin(stream::iter(chunks)),
                generation_precondition: None,
            })
            .await?;
        Ok(record)
    }
}

#[tokio::test]
async fn create_write_sync_read_cycle() -> Result<()> {
    let fx = fixture().await?;
    let mut proxy = fx.proxy(0, 0)?;

    assert_eq!(proxy.write_at(b"taco", 0).await?, 4);

    let generation = proxy.sync().await?;
    assert!(generation > 0);
    assert_eq!(fx.bucket.generation(OBJECT_NAME), generation);
    assert_eq!(fx.bucket.contents(OBJECT_NAME).as_deref(), Some(&b"taco"[..]));

    // Reads keep coming from the local copy.
    let mut buf = [0u8; 1024];
    let n = proxy.read_at(&mut buf, 0).await?;
    assert_eq!(&buf[..n], b"taco");

    // Nothing changed, so the same generation comes back untouched.
    assert_eq!(proxy.sync().await?, generation);
    Ok(())
}

#[tokio::test]
async fn writes_past_the_end_read_back_zero_filled() -> Result<()> {
    let fx = fixture().await?;
    let mut proxy = fx.proxy(0, 0)?;

    assert_eq!(proxy.write_at(b"taco", 2).await?, 4);

    let mut buf = [0u8; 1024];
    let n = proxy.read_at(&mut buf, 0).await?;
    assert_eq!(&buf[..n], b"\x00\x00taco");

    let mut buf = [0u8; 4];
    let n = proxy.read_at(&mut buf, 1).await?;
    assert_eq!(n, 4);
    assert_eq!(&buf, b"\x00tac");
    Ok(())
}

#[tokio::test]
async fn branching_reads_the_source_once() -> Result<()> {
    let fx = fixture().await?;
    let source = fx.seed("tacoburrito").await?;
    let mut proxy = fx.proxy(source.generation, source.size)?;

    let mut buf = [0u8; 4];
    let n = proxy.read_at(&mut buf, 0).await?;
    assert_eq!(n, 4);
    assert_eq!(&buf, b"taco");

    let n = proxy.read_at(&mut buf, 2).await?;
    assert_eq!(n, 4);
    assert_eq!(&buf, b"cobu");
    Ok(())
}

#[tokio::test]
async fn appending_to_a_branch_publishes_the_combined_object() -> Result<()> {
    let fx = fixture().await?;
    let source = fx.seed("taco").await?;
    let mut proxy = fx.proxy(source.generation, source.size)?;

    proxy.write_at(b"burrito", 4).await?;
    let generation = proxy.sync().await?;

    assert!(generation > source.generation);
    assert_eq!(
        fx.bucket.contents(OBJECT_NAME).as_deref(),
        Some(&b"tacoburrito"[..])
    );

    // The proxy is now based on the generation it just published.
    let stat = proxy.stat().await?;
    assert_eq!(stat.size, 11);
    assert!(!stat.clobbered);
    Ok(())
}

#[tokio::test]
async fn publishing_over_an_existing_object_is_a_precondition_failure() -> Result<()> {
    let fx = fixture().await?;
    fx.seed("already here").await?;

    // This proxy believes no object exists yet.
    let mut proxy = fx.proxy(0, 0)?;
    proxy.write_at(b"taco", 0).await?;

    let err = proxy.sync().await.expect_err("sync over live object");
    assert!(err.is_precondition(), "{err}");

    // The proxy stays dirty and retries; the object is still in the way.
    let err = proxy.sync().await.expect_err("retry");
    assert!(err.is_precondition(), "{err}");

    // The remote object was never touched.
    assert_eq!(
        fx.bucket.contents(OBJECT_NAME).as_deref(),
        Some(&b"already here"[..])
    );
    Ok(())
}

#[tokio::test]
async fn remote_overwrite_is_reported_as_a_clobber() -> Result<()> {
    let fx = fixture().await?;
    let source = fx.seed(&"a".repeat(456)).await?;
    let mut proxy = fx.proxy(source.generation, source.size)?;

    proxy.truncate(473).await?;

    // Another writer replaces the object behind our back.
    let newer = fx.seed("winner").await?;
    assert!(newer.generation > source.generation);

    let stat = proxy.stat().await?;
    assert_eq!(stat.size, 473);
    assert!(stat.clobbered);

    // Publishing the stale branch is refused and the local edits survive.
    let err = proxy.sync().await.expect_err("stale sync");
    assert!(err.is_precondition(), "{err}");

    let mut buf = [0u8; 1];
    let n = proxy.read_at(&mut buf, 0).await?;
    assert_eq!(n, 1);
    assert_eq!(buf[0], b'a');
    Ok(())
}

#[tokio::test]
async fn deleted_source_is_reported_as_a_clobber() -> Result<()> {
    let fx = fixture().await?;

    // Branch from a generation the bucket has never seen; every lookup
    // reports the object missing.
    let mut proxy = fx.proxy(17, 4)?;

    let stat = proxy.stat().await?;
    assert_eq!(stat.size, 4);
    assert!(stat.clobbered);

    // Materialization fails for the same reason, and the failure is clean:
    // the proxy is still usable afterwards.
    let mut buf = [0u8; 4];
    let err = proxy.read_at(&mut buf, 0).await.expect_err("read");
    assert!(err.is_not_found(), "{err}");

    let stat = proxy.stat().await?;
    assert_eq!(stat.size, 4);
    Ok(())
}

#[tokio::test]
async fn untouched_new_object_syncs_as_empty() -> Result<()> {
    let fx = fixture().await?;
    let mut proxy = fx.proxy(0, 0)?;

    // The caller asked for the object to exist, so an untouched proxy
    // publishes an empty generation.
    let generation = proxy.sync().await?;
    assert!(generation > 0);
    assert_eq!(fx.bucket.contents(OBJECT_NAME).as_deref(), Some(&b""[..]));
    Ok(())
}
