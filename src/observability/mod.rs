//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher, stages and sessions produce:
//!     → logging.rs (structured log events with connection_id)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → stdout log output
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```

pub mod logging;
pub mod metrics;
