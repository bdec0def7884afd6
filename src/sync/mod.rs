//! Account synchronization.
//!
//! A pass reads the checkpoint, picks a strategy (full scan on first run, incremental afterwards),
//! decodes the accounts in scope kind by kind, upserts them in batches and finally advances the
//! checkpoint. The checkpoint is only written after every batch of the pass was accepted, so an
//! aborted pass is simply retried by the next one.

pub mod change_detector;
pub mod orchestrator;
pub mod progress_tracker;
pub mod schema_directory;
pub mod strategies;

pub use change_detector::{ChangeDetector, ChangeSet};
pub use orchestrator::SyncOrchestrator;
pub use progress_tracker::{SyncProgressTracker, SyncStats};
pub use schema_directory::SchemaDirectory;
pub use strategies::{
	AccountFilter, FullScanSync, IncrementalSync, PassScope, SyncConfig, SyncStrategy,
};

use crate::ledger::LedgerError;
use crate::model::{AccountKind, Checkpoint};
use crate::store::StoreError;

use std::fmt;

/// Error types for a synchronization pass
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
	#[error("Ledger error: {0}")]
	Ledger(#[from] LedgerError),

	#[error("Failed to persist {kind} batch: {source}")]
	Persist {
		kind: AccountKind,
		#[source]
		source: StoreError,
	},

	#[error("Checkpoint error: {0}")]
	Checkpoint(#[source] StoreError),
}

/// How a pass selects the accounts it visits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
	FullScan,
	Incremental,
}

impl SyncMode {
	pub fn for_checkpoint(checkpoint: &Checkpoint) -> Self {
		if checkpoint.is_initial() {
			SyncMode::FullScan
		} else {
			SyncMode::Incremental
		}
	}
}

impl fmt::Display for SyncMode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SyncMode::FullScan => f.write_str("full scan"),
			SyncMode::Incremental => f.write_str("incremental"),
		}
	}
}

/// Outcome of a completed pass.
#[derive(Debug, Clone)]
pub struct PassReport {
	pub mode: SyncMode,
	pub stats: SyncStats,
	/// Checkpoint written by the pass; `None` when there was nothing to do.
	pub checkpoint: Option<Checkpoint>,
}

impl PassReport {
	pub fn is_idle(&self) -> bool {
		self.checkpoint.is_none()
	}
}
