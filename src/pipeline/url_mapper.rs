//! Exact-path request rewriting.

use axum::body::Body;
use axum::http::uri::{PathAndQuery, Uri};
use axum::http::Request;
use futures_util::future::BoxFuture;

use crate::error::MuxError;
use crate::net::ConnectionInfo;
use crate::pipeline::stage::{Flow, HttpStage};

/// Rewrites requests whose path equals `from` to `to`, keeping the query string.
#[derive(Debug, Clone)]
pub struct UrlMapperStage {
    from: String,
    to: String,
}

impl UrlMapperStage {
    pub const NAME: &'static str = "url-mapper";

    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    fn rewrite(&self, uri: &Uri) -> Result<Option<Uri>, MuxError> {
        if uri.path() != self.from {
            return Ok(None);
        }

        let target = match uri.query() {
            Some(query) => format!("{}?{}", self.to, query),
            None => self.to.clone(),
        };

        let mut parts = uri.clone().into_parts();
        parts.path_and_query = Some(
            target
                .parse::<PathAndQuery>()
                .map_err(|e| MuxError::downstream(Self::NAME, e))?,
        );
        Uri::from_parts(parts)
            .map(Some)
            .map_err(|e| MuxError::downstream(Self::NAME, e))
    }
}

impl HttpStage for UrlMapperStage {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn handle(
        &self,
        mut req: Request<Body>,
        _conn: ConnectionInfo,
    ) -> BoxFuture<'_, Result<Flow, MuxError>> {
        Box::pin(async move {
            if let Some(uri) = self.rewrite(req.uri())? {
                tracing::trace!(from = %req.uri(), to = %uri, "Rewriting request path");
                *req.uri_mut() = uri;
            }
            Ok(Flow::Next(req))
        })
    }
}
