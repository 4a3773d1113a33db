//! Chain definitions and per-connection assembly.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;

use crate::config::MuxConfig;
use crate::error::MuxError;
use crate::net::{ConnectionInfo, ConnectionTracker};
use crate::pipeline::{
    Chain, ChainTemplate, ChunkedWriteStage, HttpHandlerStage, Protocol, ResourceSource,
    StaticFileStage, StaticMount, UrlMapperStage,
};
use crate::ws::{
    EchoLoginFactory, LoginFactory, MessageCodec, OpaqueCodec, SessionTemplate, WsHandshakeStage,
};

/// Resource the admin root path is rewritten to.
pub const ADMIN_PAGE: &str = "/static/admin/admin.html";
pub const FAVICON_PATH: &str = "/favicon.ico";
pub const FAVICON_RESOURCE: &str = "/static/favicon.ico";
pub const STATIC_PREFIX: &str = "/static";

/// Application handlers the chains hand traffic to.
#[derive(Clone)]
pub struct Collaborators {
    /// Router behind the Plain-HTTP chain.
    pub http_api: Router,
    /// Router behind the Admin chain.
    pub admin_api: Router,
    /// Shared codec for WebSocket message payloads.
    pub codec: Arc<dyn MessageCodec>,
    /// Creates the per-connection login stage of the WebSocket chain.
    pub login: Arc<dyn LoginFactory>,
}

impl Collaborators {
    /// The handlers shipped with the binary.
    pub fn builtin(config: &MuxConfig, tracker: ConnectionTracker) -> Self {
        Self {
            http_api: crate::http::api::default_router(),
            admin_api: crate::admin::setup_admin_router(&config.paths.admin_root_path, tracker),
            codec: Arc::new(OpaqueCodec),
            login: Arc::new(EchoLoginFactory),
        }
    }
}

/// Holds one template per protocol and instantiates them per connection.
#[derive(Clone)]
pub struct Assembler {
    admin: ChainTemplate,
    plain: ChainTemplate,
    websocket: ChainTemplate,
}

impl Assembler {
    /// Each template must belong to the protocol of its slot.
    pub fn new(
        admin: ChainTemplate,
        plain: ChainTemplate,
        websocket: ChainTemplate,
    ) -> Result<Self, MuxError> {
        for (expected, template) in [
            (Protocol::Admin, &admin),
            (Protocol::PlainHttp, &plain),
            (Protocol::WebSocket, &websocket),
        ] {
            if template.protocol() != expected {
                return Err(MuxError::Assembly(format!(
                    "{} template registered for {expected}",
                    template.protocol()
                )));
            }
        }
        Ok(Self {
            admin,
            plain,
            websocket,
        })
    }

    /// Build the canonical chains from configuration.
    pub fn from_config(config: &MuxConfig, collaborators: Collaborators) -> Result<Self, MuxError> {
        let paths = &config.paths;
        let files = &config.static_files;
        let source = ResourceSource::from_unpacked(files.unpacked, &files.root);
        let request_timeout = Duration::from_secs(config.timeouts.request_secs);

        let admin = ChainTemplate::http(
            Protocol::Admin,
            vec![
                Arc::new(ChunkedWriteStage::new(files.chunk_size)),
                Arc::new(UrlMapperStage::new(&paths.admin_root_path, ADMIN_PAGE)),
                Arc::new(UrlMapperStage::new(FAVICON_PATH, FAVICON_RESOURCE)),
                Arc::new(StaticFileStage::new(
                    source.clone(),
                    vec![StaticMount::Prefix {
                        prefix: STATIC_PREFIX.into(),
                        cache: false,
                    }],
                )),
                Arc::new(HttpHandlerStage::new(collaborators.admin_api, request_timeout)),
            ],
        );

        let plain = ChainTemplate::http(
            Protocol::PlainHttp,
            vec![
                Arc::new(ChunkedWriteStage::new(files.chunk_size)),
                Arc::new(UrlMapperStage::new(FAVICON_PATH, FAVICON_RESOURCE)),
                Arc::new(StaticFileStage::new(
                    source,
                    vec![
                        StaticMount::Prefix {
                            prefix: STATIC_PREFIX.into(),
                            cache: true,
                        },
                        StaticMount::EndsWith {
                            dir: files.csv_dir.clone(),
                            suffix: files.csv_suffix.clone(),
                        },
                    ],
                )),
                Arc::new(HttpHandlerStage::new(collaborators.http_api, request_timeout)),
            ],
        );

        let websocket = ChainTemplate::websocket(
            Arc::new(WsHandshakeStage::new(&paths.websocket_path)),
            SessionTemplate::new(collaborators.codec, collaborators.login),
        );

        Self::new(admin, plain, websocket)
    }

    pub fn template(&self, protocol: Protocol) -> &ChainTemplate {
        match protocol {
            Protocol::Admin => &self.admin,
            Protocol::PlainHttp => &self.plain,
            Protocol::WebSocket => &self.websocket,
        }
    }

    /// Build the complete chain for `protocol`. Nothing is attached to the
    /// connection unless this returns `Ok`.
    pub fn assemble(&self, protocol: Protocol, conn: ConnectionInfo) -> Result<Chain, MuxError> {
        let chain = self.template(protocol).instantiate(conn)?;
        tracing::debug!(
            connection_id = %conn.id,
            protocol = %protocol,
            stages = ?chain.stage_names(),
            "Chain assembled"
        );
        Ok(chain)
    }
}
