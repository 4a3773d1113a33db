//! Connection-time protocol dispatch.
//!
//! # Data Flow
//! ```text
//! first request on a connection
//!     → dispatcher.rs (per-connection state machine)
//!     → classifier.rs (path → Redirect | Admin | WebSocket | PlainHttp)
//!     → security::access_control (Admin only)
//!     → assembler.rs (template → chain owned by the connection)
//!     → chain runs this and every later request
//!
//! faults at any step
//!     → fault.rs (generic error response or connection close)
//! ```

pub mod assembler;
pub mod classifier;
pub mod dispatcher;
pub mod fault;

pub use assembler::{Assembler, Collaborators};
pub use classifier::{Classifier, ProtocolDecision};
pub use dispatcher::{ConnectionDispatcher, DispatchContext, DispatchPhase};
