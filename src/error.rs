//! Crate-level error type.
//!
//! Every fault raised while classifying, gating, assembling or running a
//! connection's chain is a [`MuxError`]. Faults are always scoped to a single
//! connection; see [`crate::dispatch::fault`] for how they are surfaced.

use std::net::IpAddr;

/// Errors produced by the multiplexer core and its stages.
#[derive(Debug, thiserror::Error)]
pub enum MuxError {
    /// The first request on a connection could not be classified.
    #[error("classification fault: {0}")]
    Classification(String),

    /// The peer is not on the administrative allow-list.
    #[error("access denied for {0}")]
    AccessDenied(IpAddr),

    /// A chain could not be constructed or attached.
    #[error("assembly fault: {0}")]
    Assembly(String),

    /// A stage in an assembled chain failed.
    #[error("stage {stage} failed: {message}")]
    Downstream {
        stage: &'static str,
        message: String,
    },

    /// The connection was already closed by an earlier fault.
    #[error("connection closed")]
    ConnectionClosed,

    /// Transport-level I/O failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl MuxError {
    /// Build a downstream fault for the named stage.
    pub fn downstream(stage: &'static str, message: impl std::fmt::Display) -> Self {
        MuxError::Downstream {
            stage,
            message: message.to_string(),
        }
    }

    /// Stable label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            MuxError::Classification(_) => "classification",
            MuxError::AccessDenied(_) => "access_denied",
            MuxError::Assembly(_) => "assembly",
            MuxError::Downstream { .. } => "downstream",
            MuxError::ConnectionClosed => "connection_closed",
            MuxError::Io(_) => "io",
        }
    }

    /// Whether this fault aborts the connection without sending a response.
    pub fn closes_connection(&self) -> bool {
        matches!(
            self,
            MuxError::AccessDenied(_) | MuxError::ConnectionClosed | MuxError::Io(_)
        )
    }
}
