//! Configuration management module
//!
//! This module turns user-supplied settings into the derived runtime state
//! the service needs: bind address, issuer, system secret, the resolved
//! cluster URL and the authenticated machine-to-machine client. It also
//! handles loading from and persisting to the settings file.

pub mod context;
pub mod defaults;
pub mod home;
pub mod secret;
pub mod settings;

pub use context::*;
pub use defaults::*;
pub use home::*;
pub use secret::*;
pub use settings::*;
