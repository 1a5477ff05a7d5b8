//! Runlet Client
//!
//! HTTP client for the Runlet JSON-RPC surface, used by the CLI and by
//! integration tests.

pub mod client;

pub use client::RunletClient;
