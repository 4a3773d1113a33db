//! Per-connection dispatcher.
//!
//! # State machine
//! ```text
//! Initial ──first request──▶ Classifying
//!   ▲                          │
//!   └──── Redirect ◀───────────┤ "/"
//!                              │ admin path ──▶ Gated ──denied──▶ Closed
//!                              │                  │
//!                              │               allowed
//!                              ▼                  ▼
//!                          Assembling ◀───────────┘
//!                              │ ok                 │ fault
//!                              ▼                    ▼
//!                          Dispatched             Closed
//! ```
//!
//! Classification runs under the state lock, so a connection is classified at
//! most once. Once `Dispatched`, requests go straight to the chain.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::body::Body;
use axum::http::{header, HeaderValue, Request, Response, StatusCode};

use crate::config::MuxConfig;
use crate::dispatch::assembler::{Assembler, Collaborators};
use crate::dispatch::classifier::Classifier;
use crate::dispatch::fault;
use crate::error::MuxError;
use crate::net::ConnectionInfo;
use crate::observability::metrics;
use crate::pipeline::{Chain, Protocol};
use crate::security::AccessGate;

/// Immutable, process-wide dispatch dependencies.
pub struct DispatchContext {
    classifier: Classifier,
    gate: AccessGate,
    assembler: Assembler,
    landing: HeaderValue,
}

impl DispatchContext {
    pub fn new(
        classifier: Classifier,
        gate: AccessGate,
        assembler: Assembler,
        landing_url: &str,
    ) -> Result<Self, MuxError> {
        let landing = HeaderValue::from_str(landing_url)
            .map_err(|e| MuxError::Assembly(format!("landing URL {landing_url:?}: {e}")))?;
        Ok(Self {
            classifier,
            gate,
            assembler,
            landing,
        })
    }

    pub fn from_config(config: &MuxConfig, collaborators: Collaborators) -> Result<Self, MuxError> {
        let classifier = Classifier::new(
            config.paths.admin_root_path.clone(),
            config.paths.websocket_path.clone(),
        );
        let gate = AccessGate::from_comma_separated(&config.admin.allowed_ips)
            .map_err(|e| MuxError::Assembly(e.to_string()))?;
        let assembler = Assembler::from_config(config, collaborators)?;
        Self::new(classifier, gate, assembler, &config.paths.landing_url)
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }
}

/// Observable dispatcher state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchPhase {
    Initial,
    Dispatched(Protocol),
    Closed,
}

enum DispatchState {
    Initial,
    Dispatched(Arc<Chain>),
    Closed,
}

enum Route {
    Redirect,
    Chain(Arc<Chain>),
    Fault(MuxError),
    Closed,
}

/// The single entry point for every request on one connection.
pub struct ConnectionDispatcher {
    ctx: Arc<DispatchContext>,
    conn: ConnectionInfo,
    state: Mutex<DispatchState>,
}

impl ConnectionDispatcher {
    pub fn new(ctx: Arc<DispatchContext>, conn: ConnectionInfo) -> Self {
        Self {
            ctx,
            conn,
            state: Mutex::new(DispatchState::Initial),
        }
    }

    pub fn connection(&self) -> ConnectionInfo {
        self.conn
    }

    pub fn phase(&self) -> DispatchPhase {
        match &*self.lock_state() {
            DispatchState::Initial => DispatchPhase::Initial,
            DispatchState::Dispatched(chain) => DispatchPhase::Dispatched(chain.protocol()),
            DispatchState::Closed => DispatchPhase::Closed,
        }
    }

    /// The attached chain, once dispatched.
    pub fn chain(&self) -> Option<Arc<Chain>> {
        match &*self.lock_state() {
            DispatchState::Dispatched(chain) => Some(Arc::clone(chain)),
            _ => None,
        }
    }

    /// Handle one request on this connection.
    pub async fn serve(&self, req: Request<Body>) -> Result<Response<Body>, MuxError> {
        let route = {
            let mut state = self.lock_state();
            let current = match &*state {
                DispatchState::Dispatched(chain) => Some(Route::Chain(Arc::clone(chain))),
                DispatchState::Closed => Some(Route::Closed),
                DispatchState::Initial => None,
            };
            match current {
                Some(route) => route,
                None => self.first_request(&mut state, &req),
            }
        };

        match route {
            Route::Redirect => Ok(self.redirect()),
            Route::Chain(chain) => match chain.run(req, self.conn).await {
                Ok(response) => Ok(response),
                Err(err) => fault::handle_fault(&self.conn, err),
            },
            Route::Fault(err) => fault::handle_fault(&self.conn, err).map(close_after),
            Route::Closed => Err(MuxError::ConnectionClosed),
        }
    }

    /// Wait for any upgraded session on this connection to end, closing it
    /// once `shutdown` resolves.
    pub async fn finish<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        if let Some(chain) = self.chain() {
            chain.join_session(shutdown).await;
        }
    }

    fn first_request(&self, state: &mut DispatchState, req: &Request<Body>) -> Route {
        match self.dispatch(req) {
            Ok(None) => Route::Redirect,
            Ok(Some(chain)) => {
                let chain = Arc::new(chain);
                // Attaching the chain detaches the dispatcher.
                *state = DispatchState::Dispatched(Arc::clone(&chain));
                Route::Chain(chain)
            }
            Err(err) => {
                *state = DispatchState::Closed;
                Route::Fault(err)
            }
        }
    }

    /// Classify, gate and assemble. `Ok(None)` means redirect.
    fn dispatch(&self, req: &Request<Body>) -> Result<Option<Chain>, MuxError> {
        let uri = req.uri();
        if !uri.path().starts_with('/') {
            return Err(MuxError::Classification(format!(
                "request target {:?} is not an absolute path",
                uri.to_string()
            )));
        }
        // The whole origin-form target, query included.
        let target = uri.path_and_query().map_or(uri.path(), |pq| pq.as_str());

        let decision = self.ctx.classifier.classify(target);
        metrics::record_dispatch(decision.as_str());
        tracing::debug!(
            connection_id = %self.conn.id,
            peer_addr = %self.conn.peer,
            target = %target,
            decision = %decision,
            "Connection classified"
        );

        let Some(protocol) = decision.protocol() else {
            return Ok(None);
        };

        if protocol == Protocol::Admin {
            let ip = self.conn.peer.ip();
            if !self.ctx.gate.check(ip) {
                return Err(MuxError::AccessDenied(ip));
            }
        }

        self.ctx.assembler.assemble(protocol, self.conn).map(Some)
    }

    fn redirect(&self) -> Response<Body> {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::MOVED_PERMANENTLY;
        response
            .headers_mut()
            .insert(header::LOCATION, self.ctx.landing.clone());
        response
    }

    fn lock_state(&self) -> MutexGuard<'_, DispatchState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn close_after(mut response: Response<Body>) -> Response<Body> {
    response
        .headers_mut()
        .insert(header::CONNECTION, HeaderValue::from_static("close"));
    response
}
