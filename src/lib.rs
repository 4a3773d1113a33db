//! Single-port protocol multiplexer.
//!
//! Every accepted connection is classified once, by the target of its first
//! request, into one of three protocol chains that then own the connection.
//!
//! ```text
//! TCP connection
//!     → net::listener (connection limit)
//!     → http::server (hyper HTTP/1.1, one dispatcher per connection)
//!     → dispatch::dispatcher (first request only)
//!         "/"          → 301 to the landing page, stay unclassified
//!         admin path   → security::access_control → Admin chain
//!         ws prefix    → WebSocket chain (handshake, then ws::session)
//!         anything     → Plain-HTTP chain
//!     → pipeline::chain (every later request on the connection)
//! ```

pub mod admin;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod pipeline;
pub mod security;
pub mod ws;

pub use config::MuxConfig;
pub use dispatch::{Collaborators, ConnectionDispatcher, DispatchContext};
pub use error::MuxError;
pub use http::MuxServer;
pub use lifecycle::Shutdown;
