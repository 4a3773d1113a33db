//! HTTP transport subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (hyper HTTP/1.1, upgrades enabled)
//!     → dispatch::ConnectionDispatcher (one per connection)
//!     → chain stages
//!     → api.rs (default Plain-HTTP handlers)
//! ```

pub mod api;
pub mod server;

pub use server::MuxServer;
