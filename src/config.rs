//! Scratch storage configuration.
//!
//! Resolution order: explicit directory override, then the
//! `OBJECT_PROXY_SCRATCH_DIR` environment variable, then the system temp
//! directory. The resolved directory is created on the spot so proxies can
//! assume it exists.

use std::env;
use std::io;
use std::path::{Path, PathBuf};

/// Environment variable naming the directory for proxy scratch files.
pub const SCRATCH_DIR_ENV: &str = "OBJECT_PROXY_SCRATCH_DIR";

/// Where proxies place their scratch files.
#[derive(Debug, Clone)]
pub struct ScratchConfig {
    scratch_dir: PathBuf,
}

impl ScratchConfig {
    /// Resolve the scratch directory from the environment.
    pub async fn from_env() -> io::Result<Self> {
        let dir = match env::var_os(SCRATCH_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => env::temp_dir(),
        };
        Self::with_dir(dir).await
    }

    /// Use `dir` for scratch files, creating it if needed.
    pub async fn with_dir(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let scratch_dir = dir.into();
        tokio::fs::create_dir_all(&scratch_dir).await?;
        Ok(Self { scratch_dir })
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }
}
