//! Runtime context handed to downstream components
//!
//! The context bundles the storage connection and the secret hasher the
//! service components share. Both are reached only through their traits.

use crate::error::{HydraError, Result};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// Cost of the default hasher
pub const DEFAULT_BCRYPT_COST: u32 = 11;

/// Storage connection capability
pub trait Connection: Send + Sync {
    fn get(&self, key: &str) -> Option<Vec<u8>>;
    fn put(&self, key: &str, value: Vec<u8>);
    fn delete(&self, key: &str) -> bool;
}

/// Hashes and verifies secrets such as client passwords
pub trait Hasher: Send + Sync {
    fn hash(&self, data: &[u8]) -> Result<Vec<u8>>;

    /// `Ok(())` when `data` matches `hash`
    fn compare(&self, hash: &[u8], data: &[u8]) -> Result<()>;
}

/// Opaque bundle of collaborator capabilities
#[derive(Clone)]
pub struct Context {
    pub connection: Arc<dyn Connection>,
    pub hasher: Arc<dyn Hasher>,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("connection", &"<Arc<dyn Connection>>")
            .field("hasher", &"<Arc<dyn Hasher>>")
            .finish()
    }
}

impl Context {
    pub fn new(connection: Arc<dyn Connection>, hasher: Arc<dyn Hasher>) -> Self {
        Self { connection, hasher }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new(
            Arc::new(MemoryConnection::default()),
            Arc::new(BCryptHasher::default()),
        )
    }
}

/// In-process storage connection
#[derive(Debug, Default)]
pub struct MemoryConnection {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl Connection for MemoryConnection {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn put(&self, key: &str, value: Vec<u8>) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value);
    }

    fn delete(&self, key: &str) -> bool {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
            .is_some()
    }
}

/// bcrypt at a configurable cost; hashes are the standard `$2b$` strings
#[derive(Debug, Clone)]
pub struct BCryptHasher {
    pub cost: u32,
}

impl Default for BCryptHasher {
    fn default() -> Self {
        Self {
            cost: DEFAULT_BCRYPT_COST,
        }
    }
}

impl Hasher for BCryptHasher {
    fn hash(&self, data: &[u8]) -> Result<Vec<u8>> {
        bcrypt::hash(data, self.cost)
            .map(String::into_bytes)
            .map_err(|e| HydraError::config(format!("bcrypt cost {}: {}", self.cost, e)))
    }

    fn compare(&self, hash: &[u8], data: &[u8]) -> Result<()> {
        let mismatch = || HydraError::authentication("hash does not match");

        let encoded = std::str::from_utf8(hash).map_err(|_| mismatch())?;
        match bcrypt::verify(data, encoded) {
            Ok(true) => Ok(()),
            _ => Err(mismatch()),
        }
    }
}
