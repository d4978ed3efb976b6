// Clippy allows for reasonable defaults
#![allow(clippy::new_without_default)] // Default not always appropriate for stateful types
#![allow(clippy::derivable_impls)] // Explicit Default impls can be clearer
#![allow(clippy::format_in_format_args)] // Nested format! can be clearer for complex strings

// Module declarations
pub mod config;
pub mod engine;
pub mod mock_engine;
mod models;
pub mod session;
pub mod shutdown;
mod utils;

// Server module (HTTP API)
pub mod server;

// Re-export models for the binaries and integration tests
pub use models::*;
