use crate::ledger::{LedgerHead, LedgerSource};
use crate::model::{Address, Checkpoint};
use crate::sync::change_detector::ChangeDetector;
use crate::sync::progress_tracker::SyncProgressTracker;
use crate::sync::{SyncError, SyncMode};

use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;

/// `22zoJMtdu4tQc2PzL74ZUT7FrwgB1Udec8DdW4yw4BdG`, the attestation service program on mainnet.
pub const DEFAULT_PROGRAM_ID: Address = Address::new([
	15, 94, 158, 213, 55, 30, 44, 112, 137, 140, 169, 253, 14, 119, 192, 6, 92, 171, 93, 160, 46,
	86, 103, 139, 39, 19, 56, 42, 243, 116, 89, 183,
]);

/// Trait for different synchronization strategies
#[async_trait::async_trait]
pub trait SyncStrategy: Send + Sync {
	/// Decide which accounts the pass visits and where the checkpoint ends up.
	async fn prepare(
		&self,
		checkpoint: &Checkpoint,
		progress_tracker: &mut SyncProgressTracker,
	) -> Result<PassScope, SyncError>;

	fn mode(&self) -> SyncMode;

	/// Get the name of this strategy
	fn name(&self) -> &'static str;
}

/// Configuration for sync strategies
#[derive(Debug, Clone)]
pub struct SyncConfig {
	/// Program whose accounts are mirrored
	pub program_id: Address,
	/// Records per upsert call
	pub batch_size: usize,
	/// Signatures fetched per change detection run
	pub signature_page_size: usize,
}

impl Default for SyncConfig {
	fn default() -> Self {
		Self {
			program_id: DEFAULT_PROGRAM_ID,
			batch_size: 100,
			signature_page_size: 1000,
		}
	}
}

/// Which decoded accounts are persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountFilter {
	All,
	Only(HashSet<Address>),
}

impl AccountFilter {
	pub fn includes(&self, address: &Address) -> bool {
		match self {
			AccountFilter::All => true,
			AccountFilter::Only(addresses) => addresses.contains(address),
		}
	}
}

/// What a pass has to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassScope {
	/// Nothing changed; leave the checkpoint alone.
	Idle,
	/// Visit every kind, persist accounts matching `filter`, then checkpoint at `target`.
	Scan {
		filter: AccountFilter,
		target: LedgerHead,
	},
}

/// Strategy for mirroring every program account
pub struct FullScanSync {
	ledger: Arc<dyn LedgerSource>,
	program_id: Address,
}

impl FullScanSync {
	pub fn new(ledger: Arc<dyn LedgerSource>, program_id: Address) -> Self {
		Self { ledger, program_id }
	}
}

#[async_trait::async_trait]
impl SyncStrategy for FullScanSync {
	async fn prepare(
		&self,
		_checkpoint: &Checkpoint,
		_progress_tracker: &mut SyncProgressTracker,
	) -> Result<PassScope, SyncError> {
		// Snapshot before scanning: anything landing mid-scan is re-checked incrementally.
		let head = self.ledger.current_head(&self.program_id).await?;
		info!(
			"Starting full scan, checkpoint target slot {} ({})",
			head.slot,
			head.signature.as_deref().unwrap_or("no program transactions")
		);

		Ok(PassScope::Scan {
			filter: AccountFilter::All,
			target: head,
		})
	}

	fn mode(&self) -> SyncMode {
		SyncMode::FullScan
	}

	fn name(&self) -> &'static str {
		"FullScanSync"
	}
}

/// Strategy for re-syncing only accounts touched since the checkpoint
pub struct IncrementalSync {
	detector: ChangeDetector,
}

impl IncrementalSync {
	pub fn new(ledger: Arc<dyn LedgerSource>, config: &SyncConfig) -> Self {
		Self {
			detector: ChangeDetector::new(ledger, config.program_id, config.signature_page_size),
		}
	}
}

#[async_trait::async_trait]
impl SyncStrategy for IncrementalSync {
	async fn prepare(
		&self,
		checkpoint: &Checkpoint,
		progress_tracker: &mut SyncProgressTracker,
	) -> Result<PassScope, SyncError> {
		info!(
			"Starting incremental sync from slot {} ({})",
			checkpoint.last_slot,
			checkpoint.last_signature.as_deref().unwrap_or("no signature")
		);

		let changes = self
			.detector
			.detect_changes(checkpoint.last_signature.as_deref(), checkpoint.last_slot)
			.await?;
		progress_tracker.record_transactions(changes.new_transactions, changes.failed_fetches);

		if changes.is_empty() {
			info!("No affected accounts, nothing to sync");
			return Ok(PassScope::Idle);
		}

		Ok(PassScope::Scan {
			filter: AccountFilter::Only(changes.affected),
			target: LedgerHead {
				slot: changes.new_slot,
				signature: changes.new_signature,
			},
		})
	}

	fn mode(&self) -> SyncMode {
		SyncMode::Incremental
	}

	fn name(&self) -> &'static str {
		"IncrementalSync"
	}
}
