//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! First request on a connection classified as Admin:
//!     → access_control.rs (peer address vs. allow-list)
//!     → allowed: continue to chain assembly
//!     → denied: connection closed, no chain attached
//! ```
//!
//! # Design Decisions
//! - Fail closed: an empty allow-list denies every peer
//! - Only the admin path is gated; other chains delegate trust downstream

pub mod access_control;

pub use access_control::{AccessGate, AccessListError};
