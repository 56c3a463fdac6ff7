//! hydra-bootstrap - configuration and credential bootstrap for hydra
//!
//! Resolves user-supplied settings into the runtime state the service needs:
//! bind address, issuer, system secret, the cluster base URL and an
//! authenticated machine-to-machine client. Settings can be persisted to the
//! user's settings file.

pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use error::{HydraError, Result};
