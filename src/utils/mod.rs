//! Utility functions module
//!
//! This module contains URL joining helpers and HTTP client construction
//! shared by the configuration and authentication layers.

pub mod network;
pub mod join;

pub use self::network::*;
pub use self::join::*;
