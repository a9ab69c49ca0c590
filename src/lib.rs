// ABOUTME: Library root for redeploy - exposes public types for testing.
// ABOUTME: The main binary is in main.rs.

pub mod compile;
pub mod config;
pub mod error;
pub mod index;
pub mod redeploy;
pub mod runtime;
pub mod server;
pub mod types;
pub mod webhook;
