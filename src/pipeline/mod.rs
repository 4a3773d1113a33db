//! Processing stages and the chains that order them.
//!
//! # Data Flow
//! ```text
//! Server start:
//!     MuxConfig + collaborators
//!     → stage instances (shared) and factories (per-connection)
//!     → one ChainTemplate per protocol (chain.rs)
//!
//! Per connection, after classification:
//!     ChainTemplate::instantiate → Chain (owned by the connection)
//!     → Chain::run for every request on that connection
//! ```
//!
//! # Design Decisions
//! - Chains are fixed stage sequences selected by protocol, never edited in place
//! - A chain only ever holds stages of its own protocol
//! - Stage lifetimes are explicit: `Shared` or `PerConnection`

pub mod bundle;
pub mod chain;
pub mod chunked;
pub mod http_handler;
pub mod stage;
pub mod static_files;
pub mod url_mapper;

pub use chain::{Chain, ChainTemplate};
pub use chunked::{ChunkedWriteStage, ChunkedWrites};
pub use http_handler::HttpHandlerStage;
pub use stage::{Flow, HttpStage, Protocol, StageEntry, StageLifetime};
pub use static_files::{ResourceSource, StaticFileStage, StaticMount};
pub use url_mapper::UrlMapperStage;
