//! Sync orchestrator and integration point for all sync services.
//!
//! This module defines the `SyncOrchestrator`, which runs one synchronization pass at a time:
//! - Reads the checkpoint and selects the strategy (full scan or incremental)
//! - Visits credentials, schemas and attestations in that order
//! - Decodes in-scope accounts, plus every schema to fill the pass's schema directory
//! - Upserts in-scope records in fixed-size batches
//! - On incremental passes, flags attestations that vanished from the ledger as closed
//! - Advances the checkpoint once every batch was accepted
//!
//! Decode failures skip the single account. Ledger query and persistence failures abort the pass
//! before the checkpoint is touched.

use crate::decoder::{AccountDecode, AccountRecord, decode_account};
use crate::ledger::{LedgerSource, ProgramAccount};
use crate::model::{AccountKind, Address, Attestation, Checkpoint, Credential, MirrorRecord, Schema};
use crate::store::{RecordBatch, SyncStore};
use crate::sync::{
	PassReport, SyncError, SyncMode,
	progress_tracker::SyncProgressTracker,
	schema_directory::SchemaDirectory,
	strategies::{AccountFilter, FullScanSync, IncrementalSync, PassScope, SyncConfig, SyncStrategy},
};
use crate::utils::short_address;

use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Drives synchronization passes against a ledger and a store.
pub struct SyncOrchestrator {
	ledger: Arc<dyn LedgerSource>,
	store: Arc<dyn SyncStore>,
	config: SyncConfig,
}

impl SyncOrchestrator {
	pub fn new(ledger: Arc<dyn LedgerSource>, store: Arc<dyn SyncStore>, config: SyncConfig) -> Self {
		Self {
			ledger,
			store,
			config,
		}
	}

	fn strategy_for(&self, mode: SyncMode) -> Box<dyn SyncStrategy> {
		match mode {
			SyncMode::FullScan => Box::new(FullScanSync::new(
				self.ledger.clone(),
				self.config.program_id,
			)),
			SyncMode::Incremental => Box::new(IncrementalSync::new(self.ledger.clone(), &self.config)),
		}
	}

	/// Run a single pass.
	///
	/// Returns the pass report on success. On error nothing after the failing step ran, and the
	/// checkpoint is unchanged.
	pub async fn run_pass(&self) -> Result<PassReport, SyncError> {
		let checkpoint = self
			.store
			.read_checkpoint()
			.await
			.map_err(SyncError::Checkpoint)?;

		let mode = SyncMode::for_checkpoint(&checkpoint);
		let strategy = self.strategy_for(mode);
		let mut progress_tracker = SyncProgressTracker::new(mode);
		debug!("Using {} with {}", strategy.name(), self.store.name());

		let scope = strategy.prepare(&checkpoint, &mut progress_tracker).await?;
		let (filter, target) = match scope {
			PassScope::Idle => {
				return Ok(PassReport {
					mode,
					stats: progress_tracker.get_stats(),
					checkpoint: None,
				});
			}
			PassScope::Scan { filter, target } => (filter, target),
		};

		let mut schema_directory = SchemaDirectory::new();
		let mut on_ledger = HashSet::new();
		for kind in AccountKind::ALL {
			self.sync_kind(
				kind,
				&filter,
				&mut on_ledger,
				&mut schema_directory,
				&mut progress_tracker,
			)
			.await?;
		}

		if let AccountFilter::Only(affected) = &filter {
			self.close_vanished(affected, &on_ledger, &mut progress_tracker)
				.await?;
		}

		let run_at = Utc::now();
		self.store
			.write_checkpoint(target.signature.as_deref(), target.slot, run_at)
			.await
			.map_err(SyncError::Checkpoint)?;

		let stats = progress_tracker.get_stats();
		info!("{}", stats.summary());
		info!("Checkpoint advanced to slot {}", target.slot);

		Ok(PassReport {
			mode,
			stats,
			checkpoint: Some(Checkpoint {
				last_signature: target.signature,
				last_slot: target.slot,
				last_run_at: Some(run_at),
			}),
		})
	}

	/// Fetch, decode and persist every in-scope account of one kind.
	///
	/// Every address the ledger returns is added to `on_ledger`, in scope or not.
	async fn sync_kind(
		&self,
		kind: AccountKind,
		filter: &AccountFilter,
		on_ledger: &mut HashSet<Address>,
		schema_directory: &mut SchemaDirectory,
		progress_tracker: &mut SyncProgressTracker,
	) -> Result<(), SyncError> {
		let accounts = self
			.ledger
			.accounts_by_discriminator(&self.config.program_id, kind.discriminator())
			.await?;
		debug!("Fetched {} {} accounts", accounts.len(), kind);

		let mut records = Vec::new();
		for ProgramAccount { address, data } in accounts {
			on_ledger.insert(address);
			let in_scope = filter.includes(&address);
			// Schemas are decoded regardless of scope; attestations in scope may need them.
			if !in_scope && kind != AccountKind::Schema {
				progress_tracker.record_out_of_scope();
				continue;
			}

			let record = match decode_account(&data) {
				AccountDecode::Decoded(record) => record,
				AccountDecode::Unrecognized(tag) => {
					warn!(
						"Skipping account {} with unrecognized discriminator {}",
						address, tag
					);
					progress_tracker.record_unrecognized();
					continue;
				}
				AccountDecode::Corrupt { kind, error } => {
					warn!(
						"Skipping corrupt {} account {}: {}",
						kind.map_or("unknown", AccountKind::label),
						address,
						error
					);
					progress_tracker.record_corrupt();
					continue;
				}
			};

			if let AccountRecord::Schema(schema) = &record {
				schema_directory.register(address, schema.clone());
			}

			if !in_scope {
				progress_tracker.record_out_of_scope();
				continue;
			}

			progress_tracker.record_decoded(record.kind());
			records.push(to_mirror_record(
				address,
				record,
				schema_directory,
				progress_tracker,
			));
		}

		for chunk in records.chunks(self.config.batch_size.max(1)) {
			let batch = RecordBatch::new(kind, chunk.to_vec());
			self.store
				.upsert_batch(&batch)
				.await
				.map_err(|source| SyncError::Persist { kind, source })?;
			progress_tracker.record_batch(batch.len());
		}

		progress_tracker.log_kind(kind);
		Ok(())
	}

	/// Flag mirrored attestations whose accounts a transaction touched but the ledger no longer
	/// holds.
	///
	/// The affected set also names signers, programs and other foreign accounts; the store ignores
	/// addresses without an attestation row.
	async fn close_vanished(
		&self,
		affected: &HashSet<Address>,
		on_ledger: &HashSet<Address>,
		progress_tracker: &mut SyncProgressTracker,
	) -> Result<(), SyncError> {
		let mut vanished: Vec<Address> = affected
			.difference(on_ledger)
			.filter(|address| **address != self.config.program_id)
			.copied()
			.collect();
		if vanished.is_empty() {
			return Ok(());
		}
		vanished.sort();

		let closed_at = Utc::now();
		for chunk in vanished.chunks(self.config.batch_size.max(1)) {
			let closed = self
				.store
				.mark_closed(chunk, closed_at)
				.await
				.map_err(|source| SyncError::Persist {
					kind: AccountKind::Attestation,
					source,
				})?;
			progress_tracker.record_closed(closed);
		}

		debug!("{} affected addresses no longer on the ledger", vanished.len());
		Ok(())
	}
}

/// Shape a decoded account into the row the store keeps for it.
fn to_mirror_record(
	address: Address,
	record: AccountRecord,
	schema_directory: &SchemaDirectory,
	progress_tracker: &mut SyncProgressTracker,
) -> MirrorRecord {
	match record {
		AccountRecord::Credential(credential) => MirrorRecord::Credential(Credential {
			address,
			is_pda_owned: !credential.authority.is_on_curve(),
			authority: credential.authority,
			name: credential.name,
			authorized_signers: credential.authorized_signers,
		}),
		AccountRecord::Schema(schema) => MirrorRecord::Schema(Schema {
			address,
			credential_address: schema.credential,
			name: schema.name,
			description: schema.description,
			layout: schema.layout,
			field_names: schema.field_names,
			is_paused: schema.is_paused,
			version: schema.version,
			// Not derivable from the schema account alone.
			is_tokenized: false,
			tokenized_mint: None,
		}),
		AccountRecord::Attestation(attestation) => {
			let data_decoded = schema_directory.resolve(&attestation.schema, &attestation.data);
			if data_decoded.is_none() {
				debug!(
					"Attestation {} stored without decoded data",
					short_address(&address)
				);
				progress_tracker.record_unresolved_payload();
			}
			let token_account =
				(!attestation.token_account.is_unset()).then_some(attestation.token_account);

			MirrorRecord::Attestation(Attestation {
				address,
				nonce: attestation.nonce,
				credential_address: attestation.credential,
				schema_address: attestation.schema,
				data_raw: attestation.data,
				data_decoded,
				signer: attestation.signer,
				expiry: attestation.expiry,
				is_tokenized: token_account.is_some(),
				token_account,
				attestation_mint: None,
				is_closed: false,
				closed_at: None,
			})
		}
	}
}
