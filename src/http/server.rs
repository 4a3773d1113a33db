//! HTTP/1.1 server that hands every accepted connection its own dispatcher.
//!
//! # Responsibilities
//! - Accept connections under the listener's connection limit
//! - Serve each one with hyper, upgrades enabled
//! - Keep the connection tracked until any upgraded session ends
//! - Drain open connections on shutdown, closing WebSocket sessions with 1001

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;
use tokio::sync::broadcast;

use crate::config::MuxConfig;
use crate::dispatch::{Collaborators, ConnectionDispatcher, DispatchContext};
use crate::error::MuxError;
use crate::net::{ConnectionInfo, ConnectionPermit, ConnectionTracker, Listener, ListenerError};

/// Protocol multiplexing server.
pub struct MuxServer {
    ctx: Arc<DispatchContext>,
    tracker: ConnectionTracker,
    shutdown_timeout: Duration,
}

impl MuxServer {
    pub fn new(
        config: &MuxConfig,
        collaborators: Collaborators,
        tracker: ConnectionTracker,
    ) -> Result<Self, MuxError> {
        let ctx = DispatchContext::from_config(config, collaborators)?;
        Ok(Self {
            ctx: Arc::new(ctx),
            tracker,
            shutdown_timeout: Duration::from_secs(config.timeouts.shutdown_secs),
        })
    }

    pub fn tracker(&self) -> &ConnectionTracker {
        &self.tracker
    }

    /// Run the accept loop until `shutdown` fires, then drain.
    pub async fn run(
        self,
        listener: Listener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ListenerError> {
        let addr = listener.local_addr().map_err(ListenerError::Accept)?;
        tracing::info!(address = %addr, "Mux server starting");

        let (drain_tx, _) = broadcast::channel::<()>(1);

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer, permit)) => {
                        self.spawn_connection(stream, peer, permit, drain_tx.subscribe());
                    }
                    Err(ListenerError::Accept(e)) => {
                        tracing::warn!(error = %e, "Accept failed");
                    }
                    Err(e) => return Err(e),
                },
                _ = shutdown.recv() => {
                    tracing::info!("Shutdown signal received, no longer accepting");
                    break;
                }
            }
        }

        let _ = drain_tx.send(());
        let active = self.tracker.active_count();
        if self.tracker.wait_for_shutdown(self.shutdown_timeout).await {
            tracing::info!(drained = active, "All connections closed");
        } else {
            tracing::warn!(
                remaining = self.tracker.active_count(),
                timeout_secs = self.shutdown_timeout.as_secs(),
                "Shutdown deadline reached with connections open"
            );
        }

        tracing::info!("Mux server stopped");
        Ok(())
    }

    fn spawn_connection(
        &self,
        stream: TcpStream,
        peer: SocketAddr,
        permit: ConnectionPermit,
        mut drain: broadcast::Receiver<()>,
    ) {
        let guard = self.tracker.track();
        let local_port = stream.local_addr().map(|addr| addr.port()).unwrap_or(0);
        let conn = ConnectionInfo::new(guard.id(), peer, local_port);
        let dispatcher = Arc::new(ConnectionDispatcher::new(Arc::clone(&self.ctx), conn));

        tokio::spawn(async move {
            let _permit = permit;
            let _guard = guard;

            let service = {
                let dispatcher = Arc::clone(&dispatcher);
                service_fn(move |req: hyper::Request<hyper::body::Incoming>| {
                    let dispatcher = Arc::clone(&dispatcher);
                    async move { dispatcher.serve(req.map(Body::new)).await }
                })
            };

            let connection = http1::Builder::new()
                .serve_connection(TokioIo::new(stream), service)
                .with_upgrades();
            tokio::pin!(connection);

            let mut draining = false;
            let result = tokio::select! {
                result = connection.as_mut() => result,
                _ = drain.recv() => {
                    draining = true;
                    connection.as_mut().graceful_shutdown();
                    connection.await
                }
            };

            if let Err(e) = result {
                tracing::debug!(
                    connection_id = %conn.id,
                    peer_addr = %conn.peer,
                    error = %e,
                    "Connection ended with error"
                );
            }

            // An upgraded session outlives hyper's connection future.
            dispatcher
                .finish(async move {
                    if !draining {
                        let _ = drain.recv().await;
                    }
                })
                .await;
            tracing::debug!(
                connection_id = %conn.id,
                phase = ?dispatcher.phase(),
                "Connection finished"
            );
        });
    }
}
