//! In-process store for dry runs and tests.

use super::{RecordBatch, StoreError, SyncStore};
use crate::model::{AccountKind, Address, Checkpoint, MirrorRecord};

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

#[derive(Debug, Default)]
struct MemoryState {
	tables: BTreeMap<AccountKind, BTreeMap<Address, MirrorRecord>>,
	checkpoint: Checkpoint,
	failing_kinds: HashSet<AccountKind>,
	upsert_calls: usize,
	checkpoint_writes: usize,
}

/// Store backed by a `BTreeMap` per account kind.
///
/// Upserts of a kind can be made to fail with [`MemoryStore::fail_upserts`] to exercise the
/// persist-failure path.
#[derive(Debug, Default)]
pub struct MemoryStore {
	state: Mutex<MemoryState>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Store seeded with an existing checkpoint.
	pub fn with_checkpoint(checkpoint: Checkpoint) -> Self {
		let store = Self::default();
		store.lock().checkpoint = checkpoint;
		store
	}

	fn lock(&self) -> MutexGuard<'_, MemoryState> {
		self.state.lock().unwrap_or_else(PoisonError::into_inner)
	}

	/// Reject every following upsert of `kind` until [`MemoryStore::clear_failures`].
	pub fn fail_upserts(&self, kind: AccountKind) {
		self.lock().failing_kinds.insert(kind);
	}

	pub fn clear_failures(&self) {
		self.lock().failing_kinds.clear();
	}

	pub fn records(&self, kind: AccountKind) -> Vec<MirrorRecord> {
		self.lock()
			.tables
			.get(&kind)
			.map(|table| table.values().cloned().collect())
			.unwrap_or_default()
	}

	pub fn get(&self, kind: AccountKind, address: &Address) -> Option<MirrorRecord> {
		self.lock()
			.tables
			.get(&kind)
			.and_then(|table| table.get(address).cloned())
	}

	pub fn record_count(&self) -> usize {
		self.lock().tables.values().map(BTreeMap::len).sum()
	}

	pub fn checkpoint(&self) -> Checkpoint {
		self.lock().checkpoint.clone()
	}

	/// Number of accepted or rejected `upsert_batch` calls.
	pub fn upsert_calls(&self) -> usize {
		self.lock().upsert_calls
	}

	pub fn checkpoint_writes(&self) -> usize {
		self.lock().checkpoint_writes
	}
}

#[async_trait::async_trait]
impl SyncStore for MemoryStore {
	async fn upsert_batch(&self, batch: &RecordBatch) -> Result<(), StoreError> {
		let mut state = self.lock();
		state.upsert_calls += 1;

		if state.failing_kinds.contains(&batch.kind) {
			return Err(StoreError::Other(format!(
				"injected failure for {} batch",
				batch.kind
			)));
		}

		if let Some(record) = batch.records.iter().find(|r| r.kind() != batch.kind) {
			return Err(StoreError::Other(format!(
				"{} record {} in {} batch",
				record.kind(),
				record.address(),
				batch.kind
			)));
		}

		let table = state.tables.entry(batch.kind).or_default();
		for record in &batch.records {
			table.insert(*record.address(), record.clone());
		}
		debug!("Memory store holds {} {} rows", table.len(), batch.kind);

		Ok(())
	}

	async fn mark_closed(
		&self,
		addresses: &[Address],
		closed_at: DateTime<Utc>,
	) -> Result<usize, StoreError> {
		let mut state = self.lock();
		if state.failing_kinds.contains(&AccountKind::Attestation) {
			return Err(StoreError::Other(
				"injected failure for attestation close".to_string(),
			));
		}

		let Some(table) = state.tables.get_mut(&AccountKind::Attestation) else {
			return Ok(0);
		};
		let mut closed = 0;
		for address in addresses {
			if let Some(MirrorRecord::Attestation(row)) = table.get_mut(address) {
				if !row.is_closed {
					row.is_closed = true;
					row.closed_at = Some(closed_at);
					closed += 1;
				}
			}
		}
		Ok(closed)
	}

	async fn read_checkpoint(&self) -> Result<Checkpoint, StoreError> {
		Ok(self.lock().checkpoint.clone())
	}

	async fn write_checkpoint(
		&self,
		signature: Option<&str>,
		slot: u64,
		run_at: DateTime<Utc>,
	) -> Result<(), StoreError> {
		let mut state = self.lock();
		state.checkpoint_writes += 1;
		state.checkpoint = Checkpoint {
			last_signature: signature.map(str::to_string),
			last_slot: slot,
			last_run_at: Some(run_at),
		};
		Ok(())
	}

	fn name(&self) -> &'static str {
		"MemoryStore"
	}
}
