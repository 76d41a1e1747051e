//! Traversal engines: the trace search and the pull resolver, plus the
//! crossing primitives and walk state they share.

pub mod cross;
pub mod pull;
pub mod trace;
pub mod walk;

pub use cross::{cross_device, follow_connection};
pub use pull::{add_pulls, resolve_pulls, PullInfo};
pub use trace::{check_trace, trace, TraceOutcome};
pub use walk::WalkState;
