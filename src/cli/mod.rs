// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! CLI module.
//!
//! This module contains the command-line interface logic: argument parsing,
//! terminal output, and the `serve` and `measure` commands.

/// CLI arguments.
pub mod args;

/// Terminal output and tracing setup.
pub mod logging;

/// Single-image measurement.
pub mod measure;

/// HTTP server startup.
pub mod serve;
