//! Chunked-write support.
//!
//! Marks requests so that downstream file writers stream bodies in chunks of
//! the configured size instead of buffering whole files.

use axum::body::Body;
use axum::http::Request;
use futures_util::future::BoxFuture;

use crate::error::MuxError;
use crate::net::ConnectionInfo;
use crate::pipeline::stage::{Flow, HttpStage};

/// Request extension read by file-serving stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkedWrites(pub usize);

#[derive(Debug, Clone)]
pub struct ChunkedWriteStage {
    chunk_size: usize,
}

impl ChunkedWriteStage {
    pub const NAME: &'static str = "chunked-write";

    pub fn new(chunk_size: usize) -> Self {
        Self { chunk_size }
    }
}

impl HttpStage for ChunkedWriteStage {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn handle(
        &self,
        mut req: Request<Body>,
        _conn: ConnectionInfo,
    ) -> BoxFuture<'_, Result<Flow, MuxError>> {
        req.extensions_mut().insert(ChunkedWrites(self.chunk_size));
        Box::pin(async move { Ok(Flow::Next(req)) })
    }
}
