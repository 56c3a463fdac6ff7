//! System secret generation and persistence

use crate::config::settings::write_private;
use crate::error::{HydraError, Result};
use async_trait::async_trait;
use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};
use std::path::{Path, PathBuf};
use tracing::debug;
use zeroize::Zeroizing;

/// Generate `len` random alphanumeric bytes from the OS CSPRNG
pub fn generate_secret(len: usize) -> Zeroizing<Vec<u8>> {
    Zeroizing::new(OsRng.sample_iter(&Alphanumeric).take(len).collect())
}

/// Storage for a generated system secret
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Previously stored secret, if any
    async fn load(&self) -> Result<Option<Zeroizing<Vec<u8>>>>;

    async fn store(&self, secret: &[u8]) -> Result<()>;
}

/// Keeps the secret as raw bytes in an owner-only file
#[derive(Debug, Clone)]
pub struct FileSecretStore {
    path: PathBuf,
}

impl FileSecretStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SecretStore for FileSecretStore {
    async fn load(&self) -> Result<Option<Zeroizing<Vec<u8>>>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => {
                debug!("Loaded system secret from: {}", self.path.display());
                Ok(Some(Zeroizing::new(bytes)))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(HydraError::secret(format!(
                "cannot read {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    async fn store(&self, secret: &[u8]) -> Result<()> {
        write_private(&self.path, secret).await.map_err(|e| {
            HydraError::secret(format!("cannot write {}: {}", self.path.display(), e))
        })?;
        debug!("Saved system secret to: {}", self.path.display());
        Ok(())
    }
}
