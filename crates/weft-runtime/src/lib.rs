//! Weft Runtime
//!
//! Executes checked, lowered Weft programs: decides which actions may fire,
//! runs them under per-instance mutual exclusion, propagates effects across
//! bound ports through a work queue, and manages the shared resources
//! (stack, heap blocks, output stream) behaviors touch.

mod error;
mod eval;
mod executor;
mod ops;
mod queue;
mod registry;
mod scheduler;
mod types;

pub use error::*;
pub use executor::{Executor, OutputStream};
pub use ops::Op;
pub use queue::{WorkItem, WorkQueue};
pub use registry::*;
pub use scheduler::{RunStats, Scheduler};
pub use types::*;
