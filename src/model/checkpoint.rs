use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Singleton marker of how far synchronization has progressed.
///
/// `last_slot == 0` means no pass has ever completed and the next pass must be a full scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
	pub last_signature: Option<String>,
	pub last_slot: u64,
	pub last_run_at: Option<DateTime<Utc>>,
}

impl Checkpoint {
	pub fn is_initial(&self) -> bool {
		self.last_slot == 0
	}
}
