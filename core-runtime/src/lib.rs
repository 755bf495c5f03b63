//! # Core Runtime Module
//!
//! Provides the runtime infrastructure shared by the decode crates:
//! - Logging and tracing initialisation
//! - Log field helpers
//!
//! ## Overview
//!
//! Library crates in this workspace only emit `tracing` events. Hosts call
//! [`logging::init_logging`] once at startup to decide where those events go.

pub mod error;
pub mod logging;

pub use error::{Error, Result};
pub use logging::{init_logging, LogFormat, LogLevel, LoggingConfig};
