//! Chain templates and the per-connection chains built from them.

use std::future::Future;
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::error::MuxError;
use crate::net::ConnectionInfo;
use crate::pipeline::stage::{Flow, HttpStage, Protocol, StageEntry};
use crate::ws::session::{FrameSession, SessionTemplate};

/// The fixed stage sequence for one protocol, built once at server start.
#[derive(Clone)]
pub struct ChainTemplate {
    protocol: Protocol,
    http: Vec<Arc<dyn HttpStage>>,
    session: Option<SessionTemplate>,
}

impl ChainTemplate {
    /// A request/response chain. All stages are shared.
    pub fn http(protocol: Protocol, stages: Vec<Arc<dyn HttpStage>>) -> Self {
        Self {
            protocol,
            http: stages,
            session: None,
        }
    }

    /// A WebSocket chain: the handshake followed by the frame pipeline.
    pub fn websocket(handshake: Arc<dyn HttpStage>, session: SessionTemplate) -> Self {
        Self {
            protocol: Protocol::WebSocket,
            http: vec![handshake],
            session: Some(session),
        }
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Stage names and lifetimes in chain order.
    pub fn layout(&self) -> Vec<StageEntry> {
        let mut layout: Vec<_> = self
            .http
            .iter()
            .map(|stage| StageEntry::shared(stage.name()))
            .collect();
        if self.session.is_some() {
            layout.extend(SessionTemplate::LAYOUT);
        }
        layout
    }

    /// Build the chain for one connection. Per-connection stages are
    /// constructed here; shared stages are reference-counted.
    pub fn instantiate(&self, conn: ConnectionInfo) -> Result<Chain, MuxError> {
        let session = self
            .session
            .as_ref()
            .map(|template| template.instantiate(conn))
            .transpose()?;

        Ok(Chain {
            protocol: self.protocol,
            layout: self.layout(),
            http: self.http.clone(),
            session: Mutex::new(session),
            session_task: Mutex::new(None),
            session_stop: Arc::new(Notify::new()),
        })
    }
}

/// A chain attached to exactly one connection.
pub struct Chain {
    protocol: Protocol,
    layout: Vec<StageEntry>,
    http: Vec<Arc<dyn HttpStage>>,
    session: Mutex<Option<FrameSession>>,
    session_task: Mutex<Option<JoinHandle<()>>>,
    session_stop: Arc<Notify>,
}

impl Chain {
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn stages(&self) -> &[StageEntry] {
        &self.layout
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.layout.iter().map(|entry| entry.name).collect()
    }

    /// Drive one request through the chain's HTTP stages in order.
    pub async fn run(
        &self,
        req: Request<Body>,
        conn: ConnectionInfo,
    ) -> Result<Response<Body>, MuxError> {
        let mut req = req;
        for stage in &self.http {
            match stage.handle(req, conn).await? {
                Flow::Next(next) => req = next,
                Flow::Respond(response) => return Ok(response),
                Flow::Upgrade {
                    response,
                    on_upgrade,
                } => {
                    self.start_session(on_upgrade, conn, stage.name())?;
                    return Ok(response);
                }
            }
        }

        let mut response = Response::new(Body::from("Not Found"));
        *response.status_mut() = StatusCode::NOT_FOUND;
        Ok(response)
    }

    /// Wait for the frame session, if one was started, to finish.
    ///
    /// When `shutdown` resolves first the session is told to close and is
    /// then awaited.
    pub async fn join_session<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let task = match self.session_task.lock() {
            Ok(mut task) => task.take(),
            Err(_) => None,
        };
        let Some(mut task) = task else {
            return;
        };

        tokio::pin!(shutdown);
        let result = tokio::select! {
            result = &mut task => result,
            _ = &mut shutdown => {
                self.stop_session();
                task.await
            }
        };
        if let Err(e) = result {
            tracing::error!(error = %e, "WebSocket session task failed");
        }
    }

    /// Ask a running frame session to close with "going away".
    pub fn stop_session(&self) {
        self.session_stop.notify_one();
    }

    fn start_session(
        &self,
        on_upgrade: hyper::upgrade::OnUpgrade,
        conn: ConnectionInfo,
        stage: &'static str,
    ) -> Result<(), MuxError> {
        let session = self
            .session
            .lock()
            .map_err(|_| MuxError::downstream(stage, "session state poisoned"))?
            .take()
            .ok_or_else(|| MuxError::downstream(stage, "connection already upgraded"))?;

        let stop = Arc::clone(&self.session_stop);
        let task = tokio::spawn(async move {
            match on_upgrade.await {
                Ok(upgraded) => session.run_upgraded(upgraded, stop).await,
                Err(e) => {
                    tracing::debug!(
                        connection_id = %conn.id,
                        error = %e,
                        "Upgrade did not complete"
                    );
                }
            }
        });

        if let Ok(mut slot) = self.session_task.lock() {
            *slot = Some(task);
        }
        Ok(())
    }
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chain")
            .field("protocol", &self.protocol)
            .field("stages", &self.stage_names())
            .finish()
    }
}
