//! Protocol classification of the first request on a connection.
//!
//! # Design Decisions
//! - Pure function of the request target (path and query) and the configured
//!   path constants
//! - Fixed evaluation order: root, admin (exact), WebSocket (prefix), plain
//! - Root and admin are exact matches; only the WebSocket check is a prefix match

use crate::pipeline::Protocol;

/// The root path that is answered with a redirect.
pub const ROOT_PATH: &str = "/";

/// Which way a connection goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolDecision {
    Redirect,
    Admin,
    WebSocket,
    PlainHttp,
}

impl ProtocolDecision {
    /// The chain this decision selects. Redirects attach no chain.
    pub fn protocol(&self) -> Option<Protocol> {
        match self {
            ProtocolDecision::Redirect => None,
            ProtocolDecision::Admin => Some(Protocol::Admin),
            ProtocolDecision::WebSocket => Some(Protocol::WebSocket),
            ProtocolDecision::PlainHttp => Some(Protocol::PlainHttp),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProtocolDecision::Redirect => "redirect",
            ProtocolDecision::Admin => "admin",
            ProtocolDecision::WebSocket => "websocket",
            ProtocolDecision::PlainHttp => "plain_http",
        }
    }
}

impl std::fmt::Display for ProtocolDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Classifier {
    admin_path: String,
    websocket_prefix: String,
}

impl Classifier {
    pub fn new(admin_path: impl Into<String>, websocket_prefix: impl Into<String>) -> Self {
        Self {
            admin_path: admin_path.into(),
            websocket_prefix: websocket_prefix.into(),
        }
    }

    pub fn admin_path(&self) -> &str {
        &self.admin_path
    }

    pub fn websocket_prefix(&self) -> &str {
        &self.websocket_prefix
    }

    /// `target` is the origin-form request target, query included.
    pub fn classify(&self, target: &str) -> ProtocolDecision {
        if target == ROOT_PATH {
            ProtocolDecision::Redirect
        } else if target == self.admin_path {
            ProtocolDecision::Admin
        } else if target.starts_with(self.websocket_prefix.as_str()) {
            ProtocolDecision::WebSocket
        } else {
            ProtocolDecision::PlainHttp
        }
    }
}
