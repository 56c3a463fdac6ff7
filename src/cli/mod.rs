//! CLI module for hydra-bootstrap
//!
//! This module contains the command definitions and their execution
//! against a loaded configuration.

pub mod commands;

pub use commands::*;
