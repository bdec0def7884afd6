//! Pass scheduling: a single pass, or passes on a fixed interval until stopped.

mod scheduler;

pub use scheduler::{RunSummary, SyncScheduler};
