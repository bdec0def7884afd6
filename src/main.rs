use sas_state_sync::config::{Cli, RunMode};
use sas_state_sync::ledger::{LedgerSource, SolanaRpcClient};
use sas_state_sync::runtime::SyncScheduler;
use sas_state_sync::store::{MemoryStore, PostgrestStore, SyncStore};
use sas_state_sync::sync::SyncOrchestrator;

use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::from_default_env()
				.add_directive("hyper_util=warn".parse().unwrap())
				.add_directive("reqwest=warn".parse().unwrap())
				.add_directive(tracing::Level::INFO.into()),
		)
		.with_target(false)
		.with_thread_ids(false)
		.with_thread_names(false)
		.with_file(false)
		.with_line_number(false)
		.with_timer(tracing_subscriber::fmt::time::time())
		.init();

	let cli = Cli::parse();

	info!("Starting attestation state sync for program {}", cli.program_id);

	let ledger: Arc<dyn LedgerSource> =
		match SolanaRpcClient::new(cli.rpc_url.clone(), cli.request_timeout()) {
			Ok(client) => Arc::new(client),
			Err(e) => {
				error!("Failed to create RPC client: {}", e);
				return ExitCode::FAILURE;
			}
		};

	let store: Arc<dyn SyncStore> = match (&cli.store_url, cli.dry_run) {
		(Some(url), false) => {
			if cli.store_key.is_empty() {
				warn!("No store key configured, requests will be anonymous");
			}
			match PostgrestStore::new(url, cli.store_key.clone(), cli.request_timeout()) {
				Ok(store) => Arc::new(store),
				Err(e) => {
					error!("Failed to create store client: {}", e);
					return ExitCode::FAILURE;
				}
			}
		}
		_ => {
			info!("Dry run, records are kept in memory");
			Arc::new(MemoryStore::new())
		}
	};

	let orchestrator = SyncOrchestrator::new(ledger, store, cli.sync_config());
	let scheduler =
		SyncScheduler::new(orchestrator, cli.interval()).with_max_passes(cli.max_passes());

	match cli.mode {
		RunMode::Once => match scheduler.run_once().await {
			Ok(_) => ExitCode::SUCCESS,
			Err(_) => ExitCode::FAILURE,
		},
		RunMode::Continuous => {
			let shutdown = CancellationToken::new();
			let signal_token = shutdown.clone();
			tokio::spawn(async move {
				match tokio::signal::ctrl_c().await {
					Ok(()) => {
						info!("Interrupt received, stopping after the current pass");
						signal_token.cancel();
					}
					Err(e) => error!("Failed to listen for interrupt: {}", e),
				}
			});

			scheduler.run(shutdown).await;
			ExitCode::SUCCESS
		}
	}
}
