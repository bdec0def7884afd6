//! Progress tracking for a synchronization pass.
//!
//! The `SyncProgressTracker` counts what happened to every account and transaction a pass looked
//! at, so that skipped records and failed fetches show up in the pass summary instead of being
//! silently dropped.

use super::SyncMode;
use crate::model::AccountKind;

use itertools::Itertools;
use std::collections::BTreeMap;
use tracing::info;

/// Per-pass counters.
#[derive(Debug, Clone)]
pub struct SyncProgressTracker {
	mode: SyncMode,
	/// Decoded and in scope, per kind
	decoded: BTreeMap<AccountKind, usize>,
	/// Unknown discriminator
	unrecognized: usize,
	/// Known discriminator, malformed body
	corrupt: usize,
	/// Not in the affected set
	out_of_scope: usize,
	/// Attestation rows flagged closed
	closed: usize,
	/// Attestations persisted without `data_decoded`
	unresolved_payloads: usize,
	batches_persisted: usize,
	records_persisted: usize,
	transactions_scanned: usize,
	failed_fetches: usize,
}

impl SyncProgressTracker {
	pub fn new(mode: SyncMode) -> Self {
		Self {
			mode,
			decoded: BTreeMap::new(),
			unrecognized: 0,
			corrupt: 0,
			out_of_scope: 0,
			closed: 0,
			unresolved_payloads: 0,
			batches_persisted: 0,
			records_persisted: 0,
			transactions_scanned: 0,
			failed_fetches: 0,
		}
	}

	pub fn record_decoded(&mut self, kind: AccountKind) {
		*self.decoded.entry(kind).or_default() += 1;
	}

	pub fn record_unrecognized(&mut self) {
		self.unrecognized += 1;
	}

	pub fn record_corrupt(&mut self) {
		self.corrupt += 1;
	}

	pub fn record_out_of_scope(&mut self) {
		self.out_of_scope += 1;
	}

	pub fn record_closed(&mut self, count: usize) {
		self.closed += count;
	}

	pub fn record_unresolved_payload(&mut self) {
		self.unresolved_payloads += 1;
	}

	pub fn record_batch(&mut self, records: usize) {
		self.batches_persisted += 1;
		self.records_persisted += records;
	}

	/// Record the outcome of the change detector's transaction scan.
	pub fn record_transactions(&mut self, scanned: usize, failed: usize) {
		self.transactions_scanned += scanned;
		self.failed_fetches += failed;
	}

	/// Log the per-kind result once a kind has been persisted.
	pub fn log_kind(&self, kind: AccountKind) {
		info!(
			"Synced {} {} accounts ({} records persisted so far)",
			self.decoded.get(&kind).copied().unwrap_or(0),
			kind,
			self.records_persisted
		);
	}

	/// Get pass statistics as a SyncStats struct
	pub fn get_stats(&self) -> SyncStats {
		SyncStats {
			mode: self.mode,
			decoded: self.decoded.clone(),
			unrecognized: self.unrecognized,
			corrupt: self.corrupt,
			out_of_scope: self.out_of_scope,
			closed: self.closed,
			unresolved_payloads: self.unresolved_payloads,
			batches_persisted: self.batches_persisted,
			records_persisted: self.records_persisted,
			transactions_scanned: self.transactions_scanned,
			failed_fetches: self.failed_fetches,
		}
	}
}

/// Statistics about one pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncStats {
	pub mode: SyncMode,
	pub decoded: BTreeMap<AccountKind, usize>,
	pub unrecognized: usize,
	pub corrupt: usize,
	pub out_of_scope: usize,
	pub closed: usize,
	pub unresolved_payloads: usize,
	pub batches_persisted: usize,
	pub records_persisted: usize,
	pub transactions_scanned: usize,
	pub failed_fetches: usize,
}

impl SyncStats {
	pub fn decoded(&self, kind: AccountKind) -> usize {
		self.decoded.get(&kind).copied().unwrap_or(0)
	}

	/// Records that were looked at but not persisted.
	pub fn skipped(&self) -> usize {
		self.unrecognized + self.corrupt
	}

	/// Get a human-readable summary of the pass statistics
	pub fn summary(&self) -> String {
		let per_kind = AccountKind::ALL
			.iter()
			.map(|kind| format!("{} {}s", self.decoded(*kind), kind))
			.join(", ");

		let mut summary = format!(
			"{} pass: {} in {} batches ({} records)",
			self.mode, per_kind, self.batches_persisted, self.records_persisted
		);
		if self.mode == SyncMode::Incremental {
			summary.push_str(&format!(
				", {} transactions scanned",
				self.transactions_scanned
			));
		}
		if self.closed > 0 {
			summary.push_str(&format!(", {} closed", self.closed));
		}
		if self.skipped() > 0 {
			summary.push_str(&format!(
				", {} skipped ({} unrecognized, {} corrupt)",
				self.skipped(),
				self.unrecognized,
				self.corrupt
			));
		}
		if self.unresolved_payloads > 0 {
			summary.push_str(&format!(
				", {} undecoded payloads",
				self.unresolved_payloads
			));
		}
		if self.failed_fetches > 0 {
			summary.push_str(&format!(", {} failed fetches", self.failed_fetches));
		}
		summary
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn summary_lists_every_kind_and_only_nonzero_problems() {
		let mut tracker = SyncProgressTracker::new(SyncMode::FullScan);
		tracker.record_decoded(AccountKind::Credential);
		tracker.record_decoded(AccountKind::Attestation);
		tracker.record_decoded(AccountKind::Attestation);
		tracker.record_batch(3);

		assert_eq!(
			tracker.get_stats().summary(),
			"full scan pass: 1 credentials, 0 schemas, 2 attestations in 1 batches (3 records)"
		);

		tracker.record_corrupt();
		tracker.record_unrecognized();
		let summary = tracker.get_stats().summary();
		assert!(summary.ends_with(", 2 skipped (1 unrecognized, 1 corrupt)"), "{summary}");
	}

	#[test]
	fn incremental_summary_reports_transactions_and_failures() {
		let mut tracker = SyncProgressTracker::new(SyncMode::Incremental);
		tracker.record_transactions(4, 1);
		tracker.record_closed(2);
		let stats = tracker.get_stats();

		assert_eq!(stats.transactions_scanned, 4);
		assert_eq!(stats.failed_fetches, 1);
		assert!(stats.summary().contains("4 transactions scanned, 2 closed"));
		assert!(stats.summary().ends_with(", 1 failed fetches"));
	}
}
