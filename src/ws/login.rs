//! Per-connection session stage at the end of the WebSocket chain.
//!
//! A [`LoginFactory`] is shared; the [`SessionStage`] it creates belongs to a
//! single connection and may hold that connection's session state.

use std::net::SocketAddr;

use futures_util::future::BoxFuture;

use crate::error::MuxError;
use crate::net::{ConnectionId, ConnectionInfo};
use crate::ws::codec::AppMessage;

/// Stage name of the login slot in the WebSocket chain.
pub const LOGIN_STAGE: &str = "generic-login";

/// What the login stage gets to know about its connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionInfo {
    pub connection_id: ConnectionId,
    pub peer: SocketAddr,
    pub listener_port: u16,
}

impl From<ConnectionInfo> for SessionInfo {
    fn from(conn: ConnectionInfo) -> Self {
        Self {
            connection_id: conn.id,
            peer: conn.peer,
            listener_port: conn.local_port,
        }
    }
}

/// Consumes decoded messages for one connection and yields replies.
pub trait SessionStage: Send {
    fn on_message(
        &mut self,
        message: AppMessage,
    ) -> BoxFuture<'_, Result<Vec<AppMessage>, MuxError>>;

    /// Called once when the session ends, for any reason.
    fn on_close(&mut self) {}
}

/// Builds a fresh [`SessionStage`] for each WebSocket connection.
pub trait LoginFactory: Send + Sync {
    fn create(&self, session: SessionInfo) -> Result<Box<dyn SessionStage>, MuxError>;
}

/// Default factory used when no login backend is injected.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoLoginFactory;

impl LoginFactory for EchoLoginFactory {
    fn create(&self, session: SessionInfo) -> Result<Box<dyn SessionStage>, MuxError> {
        Ok(Box::new(EchoLogin {
            session,
            received: 0,
        }))
    }
}

/// Echoes every message back to the sender.
#[derive(Debug)]
pub struct EchoLogin {
    session: SessionInfo,
    received: u64,
}

impl EchoLogin {
    pub fn received(&self) -> u64 {
        self.received
    }
}

impl SessionStage for EchoLogin {
    fn on_message(
        &mut self,
        message: AppMessage,
    ) -> BoxFuture<'_, Result<Vec<AppMessage>, MuxError>> {
        self.received += 1;
        Box::pin(async move { Ok(vec![message]) })
    }

    fn on_close(&mut self) {
        tracing::debug!(
            connection_id = %self.session.connection_id,
            peer_addr = %self.session.peer,
            messages = self.received,
            "Session closed"
        );
    }
}
