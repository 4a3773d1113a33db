//! Shared fault handling.
//!
//! Every fault is scoped to the connection it happened on. Faults that can be
//! answered produce the generic error response; the rest abort the connection.

use axum::body::Body;
use axum::http::{header, HeaderValue, Response, StatusCode};
use serde::Serialize;

use crate::error::MuxError;
use crate::net::ConnectionInfo;
use crate::observability::metrics;

#[derive(Debug, Serialize)]
struct FaultBody<'a> {
    error: FaultDetail<'a>,
}

#[derive(Debug, Serialize)]
struct FaultDetail<'a> {
    kind: &'a str,
    message: &'a str,
}

/// Translate a fault into a connection-scoped outcome.
///
/// Returns the generic error response, or the fault itself when the
/// connection must be torn down without a response.
pub fn handle_fault(conn: &ConnectionInfo, err: MuxError) -> Result<Response<Body>, MuxError> {
    log_fault(conn, &err);
    if err.closes_connection() {
        return Err(err);
    }
    Ok(fault_response(&err))
}

/// Same contract for a WebSocket session; the caller closes the session.
pub fn session_fault(conn: &ConnectionInfo, err: &MuxError) {
    log_fault(conn, err);
}

/// The generic 500 response for a fault. Only the fault kind reaches the
/// client; the detail is logged.
pub fn fault_response(err: &MuxError) -> Response<Body> {
    let body = FaultBody {
        error: FaultDetail {
            kind: err.kind(),
            message: client_message(err),
        },
    };
    let json = serde_json::to_vec(&body).unwrap_or_default();

    let mut response = Response::new(Body::from(json));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    response
}

fn client_message(err: &MuxError) -> &'static str {
    match err {
        MuxError::Classification(_) => "request could not be classified",
        MuxError::AccessDenied(_) => "access denied",
        MuxError::Assembly(_) => "connection could not be set up",
        MuxError::Downstream { .. } => "request failed",
        MuxError::ConnectionClosed => "connection closed",
        MuxError::Io(_) => "transport error",
    }
}

fn log_fault(conn: &ConnectionInfo, err: &MuxError) {
    metrics::record_fault(err.kind());
    match err {
        MuxError::AccessDenied(_) | MuxError::ConnectionClosed => {
            tracing::info!(
                connection_id = %conn.id,
                peer_addr = %conn.peer,
                error = %err,
                "Closing connection"
            );
        }
        MuxError::Io(_) => {
            tracing::debug!(
                connection_id = %conn.id,
                peer_addr = %conn.peer,
                error = %err,
                "Transport error"
            );
        }
        _ => {
            tracing::warn!(
                connection_id = %conn.id,
                peer_addr = %conn.peer,
                kind = err.kind(),
                error = %err,
                "Connection fault"
            );
        }
    }
}
