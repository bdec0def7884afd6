use crate::sync::{PassReport, SyncError, SyncOrchestrator};
use crate::utils::format_interval;

use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Passes executed by [`SyncScheduler::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
	pub passes: usize,
	pub failed: usize,
}

/// Runs orchestrator passes one after another.
///
/// A pass is never interrupted; the stop signal is observed while waiting for the next one.
pub struct SyncScheduler {
	orchestrator: SyncOrchestrator,
	interval: Duration,
	max_passes: Option<usize>,
}

impl SyncScheduler {
	pub fn new(orchestrator: SyncOrchestrator, interval: Duration) -> Self {
		Self {
			orchestrator,
			interval,
			max_passes: None,
		}
	}

	/// Stop after `max_passes` passes, failed ones included.
	pub fn with_max_passes(mut self, max_passes: Option<usize>) -> Self {
		self.max_passes = max_passes;
		self
	}

	/// Run exactly one pass.
	pub async fn run_once(&self) -> Result<PassReport, SyncError> {
		match self.orchestrator.run_pass().await {
			Ok(report) => {
				if report.is_idle() {
					info!("Pass finished, already up to date");
				}
				Ok(report)
			}
			Err(e) => {
				error!("Pass aborted, checkpoint unchanged: {}", e);
				Err(e)
			}
		}
	}

	/// Run passes every `interval` until `shutdown` is cancelled or the pass bound is reached.
	///
	/// A failed pass is logged and the loop carries on with the next one.
	pub async fn run(&self, shutdown: CancellationToken) -> RunSummary {
		info!(
			"Starting continuous sync every {}",
			format_interval(self.interval)
		);
		let mut summary = RunSummary::default();

		loop {
			if shutdown.is_cancelled() {
				info!("Sync loop shutting down");
				break;
			}

			if self.run_once().await.is_err() {
				summary.failed += 1;
			}
			summary.passes += 1;

			if self.max_passes.is_some_and(|max| summary.passes >= max) {
				info!("Reached pass limit of {}", summary.passes);
				break;
			}

			tokio::select! {
				_ = tokio::time::sleep(self.interval) => {}
				_ = shutdown.cancelled() => {
					info!("Sync loop shutting down");
					break;
				}
			}
		}

		info!(
			"Sync loop finished after {} passes ({} failed)",
			summary.passes, summary.failed
		);
		summary
	}
}
