//! Persistence surface for mirrored records and the sync checkpoint.
//!
//! The orchestrator writes through [`SyncStore`]; [`PostgrestStore`] talks to a PostgREST
//! endpoint and [`MemoryStore`] keeps everything in process for dry runs and tests.

mod memory;
mod postgrest;

pub use memory::MemoryStore;
pub use postgrest::PostgrestStore;

use crate::model::{AccountKind, Address, Checkpoint, MirrorRecord};

use chrono::{DateTime, Utc};

/// Records of a single kind, written together.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordBatch {
	pub kind: AccountKind,
	pub records: Vec<MirrorRecord>,
}

impl RecordBatch {
	pub fn new(kind: AccountKind, records: Vec<MirrorRecord>) -> Self {
		Self { kind, records }
	}

	pub fn len(&self) -> usize {
		self.records.len()
	}

	pub fn is_empty(&self) -> bool {
		self.records.is_empty()
	}
}

/// Keyed-upsert store with a singleton checkpoint.
#[async_trait::async_trait]
pub trait SyncStore: Send + Sync {
	/// Insert or replace every record of the batch by address.
	async fn upsert_batch(&self, batch: &RecordBatch) -> Result<(), StoreError>;

	/// Flag the open attestation rows among `addresses` as closed at `closed_at`.
	///
	/// Addresses without an attestation row are ignored. Returns how many rows were flagged.
	async fn mark_closed(
		&self,
		addresses: &[Address],
		closed_at: DateTime<Utc>,
	) -> Result<usize, StoreError>;

	/// Current checkpoint; the zero checkpoint if none was ever written.
	async fn read_checkpoint(&self) -> Result<Checkpoint, StoreError>;

	async fn write_checkpoint(
		&self,
		signature: Option<&str>,
		slot: u64,
		run_at: DateTime<Utc>,
	) -> Result<(), StoreError>;

	/// Get the name of this store for logging
	fn name(&self) -> &'static str;
}

/// Error types for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
	#[error("HTTP error: {0}")]
	Http(#[from] reqwest::Error),

	#[error("Store rejected request with status {status}: {body}")]
	Rejected { status: u16, body: String },

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),

	#[error("Store error: {0}")]
	Other(String),
}
