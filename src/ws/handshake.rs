//! WebSocket handshake stage (RFC 6455 server side).

use axum::body::Body;
use axum::http::{
    header, HeaderMap, HeaderName, HeaderValue, Method, Request, Response, StatusCode,
};
use futures_util::future::BoxFuture;
use tokio_tungstenite::tungstenite::handshake::derive_accept_key;

use crate::error::MuxError;
use crate::net::ConnectionInfo;
use crate::pipeline::stage::{Flow, HttpStage};

/// Validates the upgrade request and answers `101 Switching Protocols`.
///
/// Any request path starting with the configured prefix is accepted.
#[derive(Debug, Clone)]
pub struct WsHandshakeStage {
    path_prefix: String,
}

impl WsHandshakeStage {
    pub const NAME: &'static str = "ws-handshake";

    pub fn new(path_prefix: impl Into<String>) -> Self {
        Self {
            path_prefix: path_prefix.into(),
        }
    }
}

impl HttpStage for WsHandshakeStage {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn handle(
        &self,
        mut req: Request<Body>,
        conn: ConnectionInfo,
    ) -> BoxFuture<'_, Result<Flow, MuxError>> {
        Box::pin(async move {
            if !req.uri().path().starts_with(self.path_prefix.as_str()) {
                return Ok(Flow::Respond(plain(StatusCode::NOT_FOUND, "Not Found")));
            }

            let accept = match accept_key(&req) {
                Ok(accept) => accept,
                Err(reason) => {
                    tracing::debug!(
                        connection_id = %conn.id,
                        reason,
                        "Rejecting WebSocket handshake"
                    );
                    return Ok(Flow::Respond(plain(StatusCode::BAD_REQUEST, reason)));
                }
            };

            let on_upgrade = hyper::upgrade::on(&mut req);

            let mut response = Response::new(Body::empty());
            *response.status_mut() = StatusCode::SWITCHING_PROTOCOLS;
            let headers = response.headers_mut();
            headers.insert(header::UPGRADE, HeaderValue::from_static("websocket"));
            headers.insert(header::CONNECTION, HeaderValue::from_static("upgrade"));
            headers.insert(header::SEC_WEBSOCKET_ACCEPT, accept);

            tracing::debug!(
                connection_id = %conn.id,
                path = %req.uri().path(),
                "WebSocket handshake accepted"
            );
            Ok(Flow::Upgrade {
                response,
                on_upgrade,
            })
        })
    }
}

fn accept_key(req: &Request<Body>) -> Result<HeaderValue, &'static str> {
    if req.method() != Method::GET {
        return Err("WebSocket handshake requires GET");
    }
    let headers = req.headers();
    if !has_token(headers, &header::UPGRADE, "websocket") {
        return Err("missing Upgrade: websocket");
    }
    if !has_token(headers, &header::CONNECTION, "upgrade") {
        return Err("missing Connection: upgrade");
    }
    if headers
        .get(header::SEC_WEBSOCKET_VERSION)
        .map(|v| v.as_bytes())
        != Some(b"13".as_slice())
    {
        return Err("unsupported Sec-WebSocket-Version");
    }
    let key = headers
        .get(header::SEC_WEBSOCKET_KEY)
        .ok_or("missing Sec-WebSocket-Key")?;

    HeaderValue::from_str(&derive_accept_key(key.as_bytes()))
        .map_err(|_| "invalid Sec-WebSocket-Key")
}

fn has_token(headers: &HeaderMap, name: &HeaderName, token: &str) -> bool {
    headers
        .get_all(name)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|part| part.trim().eq_ignore_ascii_case(token))
}

fn plain(status: StatusCode, body: &'static str) -> Response<Body> {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response
}
