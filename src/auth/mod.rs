//! Authentication module for machine-to-machine calls
//!
//! This module provides the client-credentials grant and the authenticated
//! HTTP client the configuration layer hands out for self-calls against the
//! cluster.

pub mod provider;

pub use provider::*;
