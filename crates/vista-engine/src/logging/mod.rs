//! Logging setup.
//!
//! The engine logs through the `log` facade; this module installs
//! `env_logger` as the backend once per process.

mod init;

pub use init::{DEFAULT_FILTER, LoggingConfig, init_logging};
