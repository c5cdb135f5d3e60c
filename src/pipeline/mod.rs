//! The fetch pipeline: a lister feeding a bounded queue, a fixed pool of
//! workers running one fetch+persist task per metric, and a coordinator
//! that waits for all of them before summarising the run.

pub mod coordinator;
pub mod lister;
pub mod outcome;
pub mod task;

pub use coordinator::{Coordinator, PoolOptions};
pub use lister::{ListingReport, list_into_queue};
pub use outcome::{OutcomeTally, RunSummary, TaskOutcome};
pub use task::{TaskContext, execute};
