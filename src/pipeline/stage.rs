//! The stage contract shared by every chain.

use axum::body::Body;
use axum::http::{Request, Response};
use futures_util::future::BoxFuture;
use hyper::upgrade::OnUpgrade;

use crate::error::MuxError;
use crate::net::ConnectionInfo;

/// Protocol family of a chain. Every stage in a chain belongs to one family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Admin,
    PlainHttp,
    WebSocket,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Admin => "admin",
            Protocol::PlainHttp => "plain_http",
            Protocol::WebSocket => "websocket",
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How long a stage instance lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageLifetime {
    /// Built once at server start and shared by every connection.
    /// Must be immutable or internally synchronized.
    Shared,
    /// Built fresh for each connection at assembly time and owned by it.
    PerConnection,
}

/// A named slot in an assembled chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageEntry {
    pub name: &'static str,
    pub lifetime: StageLifetime,
}

impl StageEntry {
    pub const fn shared(name: &'static str) -> Self {
        Self {
            name,
            lifetime: StageLifetime::Shared,
        }
    }

    pub const fn per_connection(name: &'static str) -> Self {
        Self {
            name,
            lifetime: StageLifetime::PerConnection,
        }
    }
}

/// What a stage did with a request.
#[derive(Debug)]
pub enum Flow {
    /// Pass the (possibly rewritten) request to the next stage.
    Next(Request<Body>),
    /// Stop here and send this response.
    Respond(Response<Body>),
    /// Send this response and hand the connection to the frame session
    /// once the transport completes the upgrade.
    Upgrade {
        response: Response<Body>,
        on_upgrade: OnUpgrade,
    },
}

/// A unit of request processing within a chain.
///
/// Stages are held behind `Arc` and called concurrently from many
/// connections, so `handle` takes `&self`.
pub trait HttpStage: Send + Sync {
    fn name(&self) -> &'static str;

    fn handle(&self, req: Request<Body>, conn: ConnectionInfo)
        -> BoxFuture<'_, Result<Flow, MuxError>>;
}
