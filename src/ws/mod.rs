//! WebSocket chain.
//!
//! # Data Flow
//! ```text
//! HTTP upgrade request
//!     → handshake.rs (validate, 101 Switching Protocols)
//!     → transport upgrade
//!     → session.rs (frame pipeline, one per connection)
//!         frames.rs  (binary frames ⇄ payload bytes)
//!         codec.rs   (payload bytes ⇄ AppMessage, shared codec)
//!         login.rs   (per-connection session stage)
//! ```

pub mod codec;
pub mod frames;
pub mod handshake;
pub mod login;
pub mod session;

pub use codec::{AppMessage, MessageCodec, OpaqueCodec};
pub use handshake::WsHandshakeStage;
pub use login::{EchoLoginFactory, LoginFactory, SessionInfo, SessionStage};
pub use session::{FrameSession, SessionTemplate};
