//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → server stops accepting → drain connections → exit
//! ```
//!
//! Shutdown has a deadline: connections still open after
//! `timeouts.shutdown_secs` are abandoned.

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::{wait_for_signal, Signal};
