//! Change detection since the last checkpoint.
//!
//! The detector pulls one newest-first page of program signatures, keeps the ones newer than the
//! checkpointed signature, and unions the account keys of those transactions into the
//! affected-set. Transactions beyond the page are not paged backwards; they are picked up by the
//! next full scan.

use crate::ledger::{LedgerError, LedgerSource, SignatureInfo};
use crate::model::Address;

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of a change detection run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
	/// Every account referenced by a successfully fetched new transaction.
	pub affected: HashSet<Address>,
	/// Candidate checkpoint slot; never lower than the previous one.
	pub new_slot: u64,
	/// Candidate checkpoint signature.
	pub new_signature: Option<String>,
	/// Transactions newer than the checkpoint found in the page.
	pub new_transactions: usize,
	pub failed_fetches: usize,
}

impl ChangeSet {
	fn unchanged(last_signature: Option<&str>, last_slot: u64) -> Self {
		Self {
			affected: HashSet::new(),
			new_slot: last_slot,
			new_signature: last_signature.map(str::to_string),
			new_transactions: 0,
			failed_fetches: 0,
		}
	}

	pub fn is_empty(&self) -> bool {
		self.affected.is_empty()
	}
}

pub struct ChangeDetector {
	ledger: Arc<dyn LedgerSource>,
	program_id: Address,
	page_size: usize,
}

impl ChangeDetector {
	pub fn new(ledger: Arc<dyn LedgerSource>, program_id: Address, page_size: usize) -> Self {
		Self {
			ledger,
			program_id,
			page_size,
		}
	}

	/// Determine the accounts touched since `(last_signature, last_slot)`.
	///
	/// Only the signature page query is fatal; a failed transaction lookup is logged and counted.
	/// If no new transaction could be fetched the returned set is empty and the candidate
	/// checkpoint equals the input.
	pub async fn detect_changes(
		&self,
		last_signature: Option<&str>,
		last_slot: u64,
	) -> Result<ChangeSet, LedgerError> {
		let page = self
			.ledger
			.recent_signatures(&self.program_id, self.page_size)
			.await?;

		let new = new_since(&page, last_signature);
		if new.is_empty() {
			debug!("No transactions since {:?}", last_signature);
			return Ok(ChangeSet::unchanged(last_signature, last_slot));
		}
		if new.len() == page.len() && page.len() >= self.page_size {
			warn!(
				"All {} signatures in the page are new; older changes are left to the next full scan",
				page.len()
			);
		}

		let mut affected = HashSet::new();
		let mut failed_fetches = 0;
		for info in new {
			match self.ledger.transaction_account_refs(&info.signature).await {
				Ok(keys) => affected.extend(keys),
				Err(e) => {
					warn!("Failed to fetch transaction {}: {}", info.signature, e);
					failed_fetches += 1;
				}
			}
		}

		if failed_fetches == new.len() {
			warn!(
				"Every one of {} new transactions failed to fetch, keeping checkpoint",
				new.len()
			);
			return Ok(ChangeSet {
				new_transactions: new.len(),
				failed_fetches,
				..ChangeSet::unchanged(last_signature, last_slot)
			});
		}

		let (new_slot, new_signature) = newest_position(new, last_signature, last_slot);

		info!(
			"Detected {} affected accounts from {} new transactions",
			affected.len(),
			new.len()
		);

		Ok(ChangeSet {
			affected,
			new_slot,
			new_signature,
			new_transactions: new.len(),
			failed_fetches,
		})
	}
}

/// The prefix of a newest-first page that is newer than `last_signature`.
fn new_since<'a>(page: &'a [SignatureInfo], last_signature: Option<&str>) -> &'a [SignatureInfo] {
	let Some(last) = last_signature else {
		return page;
	};
	match page.iter().position(|info| info.signature == last) {
		Some(index) => &page[..index],
		None => {
			debug!("Checkpoint signature {} not in page, treating page as new", last);
			page
		}
	}
}

/// Highest slot among `new` and the signature that produced it, never below the checkpoint.
///
/// Ties keep the first (newest) entry.
fn newest_position(
	new: &[SignatureInfo],
	last_signature: Option<&str>,
	last_slot: u64,
) -> (u64, Option<String>) {
	let mut best: Option<&SignatureInfo> = None;
	for info in new {
		if best.is_none_or(|current| info.slot > current.slot) {
			best = Some(info);
		}
	}

	match best {
		Some(info) if info.slot >= last_slot => (info.slot, Some(info.signature.clone())),
		_ => (last_slot, last_signature.map(str::to_string)),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::ledger::{LedgerHead, ProgramAccount};
	use pretty_assertions::assert_eq;
	use std::collections::HashMap;

	#[derive(Default)]
	struct PageLedger {
		page: Vec<SignatureInfo>,
		refs: HashMap<String, Vec<Address>>,
	}

	#[async_trait::async_trait]
	impl LedgerSource for PageLedger {
		async fn accounts_by_discriminator(
			&self,
			_program_id: &Address,
			_discriminator: u8,
		) -> Result<Vec<ProgramAccount>, LedgerError> {
			Ok(vec![])
		}

		async fn recent_signatures(
			&self,
			_program_id: &Address,
			limit: usize,
		) -> Result<Vec<SignatureInfo>, LedgerError> {
			Ok(self.page.iter().take(limit).cloned().collect())
		}

		async fn transaction_account_refs(
			&self,
			signature: &str,
		) -> Result<Vec<Address>, LedgerError> {
			self.refs
				.get(signature)
				.cloned()
				.ok_or_else(|| LedgerError::TransactionNotFound(signature.to_string()))
		}

		async fn current_head(&self, _program_id: &Address) -> Result<LedgerHead, LedgerError> {
			Ok(LedgerHead {
				slot: 0,
				signature: None,
			})
		}
	}

	fn sig(signature: &str, slot: u64) -> SignatureInfo {
		SignatureInfo {
			signature: signature.to_string(),
			slot,
		}
	}

	fn key(byte: u8) -> Address {
		Address::new([byte; 32])
	}

	fn detector(ledger: PageLedger) -> ChangeDetector {
		ChangeDetector::new(Arc::new(ledger), key(0xaa), 1000)
	}

	#[tokio::test]
	async fn single_new_transaction_yields_its_accounts_and_position() {
		let ledger = PageLedger {
			page: vec![sig("s1", 120), sig("s0", 100)],
			refs: HashMap::from([("s1".to_string(), vec![key(1)])]),
		};

		let changes = detector(ledger).detect_changes(Some("s0"), 100).await.unwrap();

		assert_eq!(changes.affected, HashSet::from([key(1)]));
		assert_eq!(changes.new_slot, 120);
		assert_eq!(changes.new_signature.as_deref(), Some("s1"));
		assert_eq!(changes.new_transactions, 1);
	}

	#[tokio::test]
	async fn checkpoint_at_head_means_no_changes() {
		let ledger = PageLedger {
			page: vec![sig("s0", 100), sig("older", 90)],
			..Default::default()
		};

		let changes = detector(ledger).detect_changes(Some("s0"), 100).await.unwrap();

		assert_eq!(changes, ChangeSet::unchanged(Some("s0"), 100));
	}

	#[tokio::test]
	async fn missing_checkpoint_signature_treats_page_as_new() {
		let ledger = PageLedger {
			page: vec![sig("s2", 130), sig("s1", 120)],
			refs: HashMap::from([
				("s2".to_string(), vec![key(2), key(3)]),
				("s1".to_string(), vec![key(1), key(2)]),
			]),
		};

		let changes = detector(ledger).detect_changes(Some("gone"), 50).await.unwrap();

		assert_eq!(changes.affected, HashSet::from([key(1), key(2), key(3)]));
		assert_eq!(changes.new_slot, 130);
		assert_eq!(changes.new_signature.as_deref(), Some("s2"));
		assert_eq!(changes.new_transactions, 2);
	}

	#[tokio::test]
	async fn no_recorded_signature_treats_page_as_new() {
		let ledger = PageLedger {
			page: vec![sig("s1", 120)],
			refs: HashMap::from([("s1".to_string(), vec![key(1)])]),
		};

		let changes = detector(ledger).detect_changes(None, 100).await.unwrap();

		assert_eq!(changes.affected, HashSet::from([key(1)]));
		assert_eq!(changes.new_signature.as_deref(), Some("s1"));
	}

	#[tokio::test]
	async fn failed_fetch_is_skipped_and_counted() {
		let ledger = PageLedger {
			page: vec![sig("s2", 130), sig("s1", 120), sig("s0", 100)],
			refs: HashMap::from([("s1".to_string(), vec![key(1)])]),
		};

		let changes = detector(ledger).detect_changes(Some("s0"), 100).await.unwrap();

		assert_eq!(changes.affected, HashSet::from([key(1)]));
		assert_eq!(changes.failed_fetches, 1);
		assert_eq!(changes.new_slot, 130);
		assert_eq!(changes.new_signature.as_deref(), Some("s2"));
	}

	#[tokio::test]
	async fn all_fetches_failing_keeps_checkpoint() {
		let ledger = PageLedger {
			page: vec![sig("s2", 130), sig("s1", 120), sig("s0", 100)],
			..Default::default()
		};

		let changes = detector(ledger).detect_changes(Some("s0"), 100).await.unwrap();

		assert!(changes.is_empty());
		assert_eq!(changes.failed_fetches, 2);
		assert_eq!(changes.new_slot, 100);
		assert_eq!(changes.new_signature.as_deref(), Some("s0"));
	}

	#[tokio::test]
	async fn slot_never_moves_backwards() {
		let ledger = PageLedger {
			page: vec![sig("s1", 90)],
			refs: HashMap::from([("s1".to_string(), vec![key(1)])]),
		};

		let changes = detector(ledger).detect_changes(Some("gone"), 100).await.unwrap();

		assert_eq!(changes.affected, HashSet::from([key(1)]));
		assert_eq!(changes.new_slot, 100);
		assert_eq!(changes.new_signature.as_deref(), Some("gone"));
	}

	#[test]
	fn equal_slots_keep_newest_signature() {
		let page = vec![sig("newer", 120), sig("older", 120)];
		assert_eq!(
			newest_position(&page, Some("s0"), 100),
			(120, Some("newer".to_string()))
		);
	}
}
