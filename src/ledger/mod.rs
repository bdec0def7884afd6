//! Ledger query surface.
//!
//! The synchronizer reads the ledger through the [`LedgerSource`] trait so that passes can run
//! against the JSON-RPC node in production and against in-memory fakes in tests.

mod client;
mod types;

pub use client::SolanaRpcClient;
pub use types::{LedgerError, LedgerHead, ProgramAccount, SignatureInfo};

use crate::model::Address;

/// Read-only view of the ledger, scoped to a single program.
#[async_trait::async_trait]
pub trait LedgerSource: Send + Sync {
	/// All program-owned accounts whose first data byte equals `discriminator`.
	async fn accounts_by_discriminator(
		&self,
		program_id: &Address,
		discriminator: u8,
	) -> Result<Vec<ProgramAccount>, LedgerError>;

	/// Up to `limit` signatures touching the program, newest first.
	async fn recent_signatures(
		&self,
		program_id: &Address,
		limit: usize,
	) -> Result<Vec<SignatureInfo>, LedgerError>;

	/// Every account key referenced by the transaction's message.
	async fn transaction_account_refs(&self, signature: &str) -> Result<Vec<Address>, LedgerError>;

	/// Newest ledger position relevant to the program.
	async fn current_head(&self, program_id: &Address) -> Result<LedgerHead, LedgerError>;
}
