//! Command-line and environment configuration.

use crate::model::Address;
use crate::sync::SyncConfig;

use clap::{Parser, ValueEnum};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RunMode {
	/// One pass, then exit.
	Once,
	/// Passes on a fixed interval until interrupted.
	Continuous,
}

#[derive(Parser, Debug, Clone)]
#[command(
	name = "sas-state-sync",
	about = "Mirror attestation service accounts into a relational store"
)]
pub struct Cli {
	/// Ledger JSON-RPC endpoint
	#[arg(long, env = "SOLANA_RPC_URL", default_value = "https://api.mainnet-beta.solana.com")]
	pub rpc_url: String,

	/// Attestation program whose accounts are mirrored
	#[arg(
		long,
		env = "SAS_PROGRAM_ID",
		default_value = "22zoJMtdu4tQc2PzL74ZUT7FrwgB1Udec8DdW4yw4BdG"
	)]
	pub program_id: Address,

	/// PostgREST project URL
	#[arg(long, env = "SUPABASE_URL", required_unless_present = "dry_run")]
	pub store_url: Option<String>,

	/// Service key for the store
	#[arg(long, env = "SUPABASE_SERVICE_ROLE_KEY", default_value = "", hide_env_values = true)]
	pub store_key: String,

	#[arg(long, env = "RUN_MODE", value_enum, default_value_t = RunMode::Once)]
	pub mode: RunMode,

	/// Delay between passes in continuous mode
	#[arg(long, env = "INDEXER_INTERVAL_MS", default_value_t = 60_000)]
	pub interval_ms: u64,

	/// Records per upsert request
	#[arg(
		long,
		env = "BATCH_SIZE",
		default_value_t = 100,
		value_parser = clap::value_parser!(u64).range(1..)
	)]
	pub batch_size: u64,

	/// Signatures inspected per incremental pass
	#[arg(
		long,
		env = "SIGNATURE_PAGE_SIZE",
		default_value_t = 1000,
		value_parser = clap::value_parser!(u64).range(1..=1000)
	)]
	pub signature_page_size: u64,

	/// Stop after this many passes in continuous mode
	#[arg(long, env = "MAX_PASSES", value_parser = clap::value_parser!(u64).range(1..))]
	pub max_passes: Option<u64>,

	/// HTTP timeout for ledger and store requests
	#[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 30)]
	pub request_timeout_secs: u64,

	/// Keep records in memory instead of writing to the store
	#[arg(long)]
	pub dry_run: bool,
}

impl Cli {
	pub fn sync_config(&self) -> SyncConfig {
		SyncConfig {
			program_id: self.program_id,
			batch_size: self.batch_size as usize,
			signature_page_size: self.signature_page_size as usize,
		}
	}

	pub fn interval(&self) -> Duration {
		Duration::from_millis(self.interval_ms)
	}

	pub fn request_timeout(&self) -> Duration {
		Duration::from_secs(self.request_timeout_secs)
	}

	pub fn max_passes(&self) -> Option<usize> {
		self.max_passes.map(|n| n as usize)
	}
}
