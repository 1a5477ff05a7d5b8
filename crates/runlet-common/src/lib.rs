//! Runlet Common Types and Transport
//!
//! This crate provides the shared protocol definitions and HTTP transport
//! helpers for the Runlet dynamic code hosting runtime.
//!
//! # Overview
//!
//! Runlet hosts uploaded JavaScript bundles as live, callable units and
//! exposes a JSON-RPC 2.0 surface to invoke functions on them by name. This
//! crate contains the pieces every component shares:
//!
//! - **Protocol Layer**: the error taxonomy, the JSON-RPC envelope, and the
//!   typed payloads for every engine operation
//! - **Transport Layer**: helpers for parsing and building JSON-RPC messages
//!   over HTTP bodies
//!
//! # Components
//!
//! - [`protocol`] - Error taxonomy, JSON-RPC envelope, operation payloads
//! - [`transport`] - HTTP body parsing/building helpers

pub mod protocol;
pub mod transport;

pub use protocol::*;
