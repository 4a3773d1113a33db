//! Terminal HTTP stage that hands requests to an application router.

use std::time::Duration;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::Request;
use axum::Router;
use futures_util::future::BoxFuture;
use tower::ServiceExt;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::error::MuxError;
use crate::net::ConnectionInfo;
use crate::pipeline::stage::{Flow, HttpStage};

/// Runs the request through an injected [`Router`].
///
/// The router sees `ConnectInfo<SocketAddr>` for the peer and gets request-id,
/// trace and timeout layers applied once at construction.
#[derive(Clone)]
pub struct HttpHandlerStage {
    router: Router,
}

impl HttpHandlerStage {
    pub const NAME: &'static str = "http-handler";

    #[allow(deprecated)]
    pub fn new(router: Router, request_timeout: Duration) -> Self {
        let router = router
            .layer(TimeoutLayer::new(request_timeout))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));
        Self { router }
    }
}

impl HttpStage for HttpHandlerStage {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn handle(
        &self,
        mut req: Request<Body>,
        conn: ConnectionInfo,
    ) -> BoxFuture<'_, Result<Flow, MuxError>> {
        req.extensions_mut().insert(ConnectInfo(conn.peer));
        let router = self.router.clone();
        Box::pin(async move {
            match router.oneshot(req).await {
                Ok(response) => Ok(Flow::Respond(response)),
                Err(never) => match never {},
            }
        })
    }
}
