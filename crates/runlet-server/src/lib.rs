//! Runlet Server
//!
//! The engine of the Runlet dynamic code hosting runtime. Uploaded
//! JavaScript is evaluated into resident callable units with the Boa
//! engine; the engine keeps them live across requests and dispatches named
//! function calls against them.
//!
//! Two hosting surfaces share the same loader:
//!
//! - **Sessions** ([`sessions`]): explicitly created containers binding
//!   named modules with lifecycle hooks, optional TTL expiry, and
//!   insertion-order function dispatch.
//! - **Stateless scripts** ([`scripts`]): a process-wide cache of
//!   standalone scripts keyed by content hash, lazily loaded and evicted
//!   on failure.

pub mod hash;
pub mod host;
pub mod http_router;
pub mod http_server;
pub mod runtime;
pub mod scripts;
pub mod sessions;

pub use host::Host;
pub use http_server::HttpServer;
pub use runtime::ScriptContext;
pub use scripts::ScriptStore;
pub use sessions::SessionRegistry;
