//! Configuration module for Owl
//!
//! Provides configuration management: CLI arguments, the runtime sync
//! configuration, and the explicit authentication mode.

mod settings;

pub use settings::*;
