//! # ecutune Library
//!
//! This library exposes the ecutune modules for testing and integration.
//!
//! The main binary uses these modules through the `main.rs` entry point.

pub mod api;
pub mod cli;
pub mod config;

// Re-export ecutune_core for convenience
pub use ecutune_core;
