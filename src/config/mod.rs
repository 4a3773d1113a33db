//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → MuxConfig (validated, immutable)
//!     → handed to MuxServer, which derives the classifier,
//!       access gate and chain templates from it
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the allow-list is read without locks
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AdminConfig, ListenerConfig, MuxConfig, ObservabilityConfig, PathConfig, StaticFilesConfig,
    TimeoutConfig,
};
