//! # BVision Diagnostics
//!
//! Debugging and diagnostic tools for BVision Hub.
//! Provides logging setup and health analysis of live-view sessions.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod connection_analyzer;
pub mod debug_logger;

// Re-export main types
pub use connection_analyzer::{ConnectionAnalyzer, ConnectionInfo, HealthSummary};
pub use debug_logger::{init_logging, init_logging_with, DebugLogger};
