//! Static resource serving.
//!
//! # Responsibilities
//! - Serve `/static/...` resources from the built-in bundle or from loose
//!   files on disk ("unpacked" mode)
//! - Serve generated archives (e.g. `*.csv.gz`) from their directory as attachments
//! - Pass every other request on to the next stage

use std::path::{Path, PathBuf};

use axum::body::Body;
use axum::http::{header, HeaderValue, Method, Request, Response, StatusCode};
use futures_util::future::BoxFuture;
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::error::MuxError;
use crate::net::ConnectionInfo;
use crate::pipeline::bundle;
use crate::pipeline::chunked::ChunkedWrites;
use crate::pipeline::stage::{Flow, HttpStage};

const CACHED: &str = "public, max-age=86400";
const NOT_CACHED: &str = "no-cache";

/// Where `/static` resources come from.
#[derive(Debug, Clone)]
pub enum ResourceSource {
    /// Assets compiled into the binary.
    Bundle,
    /// Loose files below this directory.
    Directory(PathBuf),
}

impl ResourceSource {
    pub fn from_unpacked(unpacked: bool, root: &Path) -> Self {
        if unpacked {
            ResourceSource::Directory(root.to_path_buf())
        } else {
            ResourceSource::Bundle
        }
    }
}

/// A rule selecting which requests the stage serves.
#[derive(Debug, Clone)]
pub enum StaticMount {
    /// Paths starting with `prefix`, looked up in the stage's [`ResourceSource`].
    Prefix { prefix: String, cache: bool },
    /// Paths ending with `suffix`, served by file name from `dir`.
    EndsWith { dir: PathBuf, suffix: String },
}

#[derive(Debug, Clone)]
pub struct StaticFileStage {
    source: ResourceSource,
    mounts: Vec<StaticMount>,
}

impl StaticFileStage {
    pub const NAME: &'static str = "static-files";

    pub fn new(source: ResourceSource, mounts: Vec<StaticMount>) -> Self {
        Self { source, mounts }
    }

    async fn serve_resource(
        &self,
        req: Request<Body>,
        path: &str,
        cache: bool,
    ) -> Result<Response<Body>, MuxError> {
        let mut response = match &self.source {
            ResourceSource::Bundle => serve_bundled(req.method(), path),
            ResourceSource::Directory(root) => {
                serve_file(req, root.join(path.trim_start_matches('/'))).await
            }
        };

        if response.status().is_success() {
            let value = if cache { CACHED } else { NOT_CACHED };
            response
                .headers_mut()
                .insert(header::CACHE_CONTROL, HeaderValue::from_static(value));
        }
        Ok(response)
    }

    async fn serve_archive(
        &self,
        req: Request<Body>,
        dir: &Path,
        path: &str,
    ) -> Result<Response<Body>, MuxError> {
        let Some(file_name) = path.rsplit('/').next().filter(|name| !name.is_empty()) else {
            return Ok(status(StatusCode::NOT_FOUND));
        };

        let mut response = serve_file(req, dir.join(file_name)).await;
        if response.status().is_success() {
            if let Ok(value) =
                HeaderValue::from_str(&format!("attachment; filename=\"{file_name}\""))
            {
                response
                    .headers_mut()
                    .insert(header::CONTENT_DISPOSITION, value);
            }
        }
        Ok(response)
    }
}

impl HttpStage for StaticFileStage {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn handle(
        &self,
        req: Request<Body>,
        _conn: ConnectionInfo,
    ) -> BoxFuture<'_, Result<Flow, MuxError>> {
        Box::pin(async move {
            let path = req.uri().path().to_owned();

            let Some(mount) = self.mounts.iter().find(|mount| match mount {
                StaticMount::Prefix { prefix, .. } => path.starts_with(prefix.as_str()),
                StaticMount::EndsWith { suffix, .. } => path.ends_with(suffix.as_str()),
            }) else {
                return Ok(Flow::Next(req));
            };

            if path.split('/').any(|segment| segment == "..") {
                tracing::warn!(path = %path, "Rejecting path traversal");
                return Ok(Flow::Respond(status(StatusCode::FORBIDDEN)));
            }

            let response = match mount {
                StaticMount::Prefix { cache, .. } => self.serve_resource(req, &path, *cache).await?,
                StaticMount::EndsWith { dir, .. } => self.serve_archive(req, dir, &path).await?,
            };
            Ok(Flow::Respond(response))
        })
    }
}

fn serve_bundled(method: &Method, path: &str) -> Response<Body> {
    if method != Method::GET && method != Method::HEAD {
        return status(StatusCode::METHOD_NOT_ALLOWED);
    }
    let Some(asset) = bundle::lookup(path) else {
        return status(StatusCode::NOT_FOUND);
    };

    let body = if method == Method::HEAD {
        Body::empty()
    } else {
        Body::from(asset.bytes)
    };
    let mut response = Response::new(body);
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(asset.content_type),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(asset.bytes.len()));
    response
}

async fn serve_file(req: Request<Body>, file: PathBuf) -> Response<Body> {
    let mut service = ServeFile::new(&file);
    if let Some(ChunkedWrites(chunk_size)) = req.extensions().get::<ChunkedWrites>().copied() {
        service = service.with_buf_chunk_size(chunk_size);
    }

    match service.oneshot(req).await {
        Ok(response) => response.map(Body::new),
        Err(never) => match never {},
    }
}

fn status(code: StatusCode) -> Response<Body> {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = code;
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::connection::test_connection;

    fn request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn respond(stage: &StaticFileStage, req: Request<Body>) -> Response<Body> {
        match stage.handle(req, test_connection()).await.unwrap() {
            Flow::Respond(response) => response,
            other => panic!("expected a response, got {other:?}"),
        }
    }

    fn scratch_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("protomux-static-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn bundled(cache: bool) -> StaticFileStage {
        StaticFileStage::new(
            ResourceSource::Bundle,
            vec![StaticMount::Prefix {
                prefix: "/static".into(),
                cache,
            }],
        )
    }

    #[tokio::test]
    async fn serves_bundled_asset() {
        let response = respond(&bundled(true), request("/static/favicon.ico")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/x-icon");
        assert_eq!(response.headers()[header::CACHE_CONTROL], CACHED);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], bundle::lookup("/static/favicon.ico").unwrap().bytes);
    }

    #[tokio::test]
    async fn uncached_mount_marks_no_cache() {
        let response = respond(&bundled(false), request("/static/admin/admin.html")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CACHE_CONTROL], NOT_CACHED);
    }

    #[tokio::test]
    async fn missing_bundled_asset_is_not_found() {
        let response = respond(&bundled(true), request("/static/nope.css")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unmatched_request_passes_through() {
        let flow = bundled(true)
            .handle(request("/api/devices"), test_connection())
            .await
            .unwrap();
        assert!(matches!(flow, Flow::Next(req) if req.uri().path() == "/api/devices"));
    }

    #[tokio::test]
    async fn traversal_is_forbidden() {
        let response = respond(&bundled(true), request("/static/../Cargo.toml")).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn unpacked_serves_loose_files_in_chunks() {
        let root = scratch_dir();
        std::fs::create_dir_all(root.join("static")).unwrap();
        let contents = "x".repeat(10_000);
        std::fs::write(root.join("static/app.js"), &contents).unwrap();

        let stage = StaticFileStage::new(
            ResourceSource::from_unpacked(true, &root),
            vec![StaticMount::Prefix {
                prefix: "/static".into(),
                cache: true,
            }],
        );
        let mut req = request("/static/app.js");
        req.extensions_mut().insert(ChunkedWrites(1024));

        let response = respond(&stage, req).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body.len(), contents.len());

        std::fs::remove_dir_all(root).unwrap();
    }

    #[tokio::test]
    async fn serves_archive_as_attachment() {
        let dir = scratch_dir();
        std::fs::write(dir.join("report_1.csv.gz"), b"\x1f\x8b archive").unwrap();

        let stage = StaticFileStage::new(
            ResourceSource::Bundle,
            vec![StaticMount::EndsWith {
                dir: dir.clone(),
                suffix: ".csv.gz".into(),
            }],
        );

        let response = respond(&stage, request("/export/report_1.csv.gz")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"report_1.csv.gz\""
        );

        let missing = respond(&stage, request("/export/other.csv.gz")).await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        std::fs::remove_dir_all(dir).unwrap();
    }
}
