//! PostgREST-backed store.
//!
//! Mirrored rows live in the `credentials`, `schemas` and `attestations` tables, each keyed by
//! `address`. Progress lives in the singleton `indexer_state` row with `id = 1`. Rows and the
//! checkpoint are written as upserts (`Prefer: resolution=merge-duplicates`) so re-running a pass
//! is idempotent. Closing an attestation is a `PATCH` restricted to rows still open.

use super::{RecordBatch, StoreError, SyncStore};
use crate::model::{AccountKind, Address, Checkpoint};

use chrono::{DateTime, Utc};
use itertools::Itertools;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const STATE_TABLE: &str = "indexer_state";
const STATE_ROW_ID: i64 = 1;
const UPSERT_PREFERENCE: &str = "resolution=merge-duplicates";
const RETURN_ROWS: &str = "return=representation";

#[derive(Debug, Serialize, Deserialize)]
struct StateRow {
	#[serde(skip_deserializing)]
	id: i64,
	last_processed_signature: Option<String>,
	last_processed_slot: Option<u64>,
	last_run_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
struct ClosePatch {
	is_closed: bool,
	closed_at: DateTime<Utc>,
}

/// Store speaking the PostgREST dialect (Supabase `rest/v1`).
pub struct PostgrestStore {
	http_client: Client,
	/// `<base>/rest/v1`, without trailing slash.
	rest_url: String,
	api_key: String,
}

impl PostgrestStore {
	/// Create a new store client.
	///
	/// # Arguments
	/// * `base_url` - Project URL; `/rest/v1` is appended.
	/// * `api_key` - Service key sent as both `apikey` and bearer token.
	/// * `timeout` - Per-request timeout.
	pub fn new(base_url: &str, api_key: String, timeout: Duration) -> Result<Self, StoreError> {
		let http_client = Client::builder().timeout(timeout).build()?;

		Ok(Self {
			http_client,
			rest_url: format!("{}/rest/v1", base_url.trim_end_matches('/')),
			api_key,
		})
	}

	pub fn table_for(kind: AccountKind) -> &'static str {
		match kind {
			AccountKind::Credential => "credentials",
			AccountKind::Schema => "schemas",
			AccountKind::Attestation => "attestations",
		}
	}

	fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
		request
			.header("apikey", &self.api_key)
			.bearer_auth(&self.api_key)
	}

	fn upsert_request(&self, table: &str, conflict_key: &str) -> RequestBuilder {
		self.authorized(
			self.http_client
				.post(format!("{}/{}", self.rest_url, table))
				.query(&[("on_conflict", conflict_key)])
				.header("Prefer", UPSERT_PREFERENCE),
		)
	}

	async fn check(response: Response) -> Result<Response, StoreError> {
		let status = response.status();
		if status.is_success() {
			return Ok(response);
		}
		let body = response.text().await.unwrap_or_default();
		Err(StoreError::Rejected {
			status: status.as_u16(),
			body,
		})
	}
}

#[async_trait::async_trait]
impl SyncStore for PostgrestStore {
	async fn upsert_batch(&self, batch: &RecordBatch) -> Result<(), StoreError> {
		if batch.is_empty() {
			return Ok(());
		}

		let table = Self::table_for(batch.kind);
		debug!("Upserting {} rows into {}", batch.len(), table);

		let response = self
			.upsert_request(table, "address")
			.json(&batch.records)
			.send()
			.await?;
		Self::check(response).await?;

		Ok(())
	}

	async fn mark_closed(
		&self,
		addresses: &[Address],
		closed_at: DateTime<Utc>,
	) -> Result<usize, StoreError> {
		if addresses.is_empty() {
			return Ok(0);
		}

		let table = Self::table_for(AccountKind::Attestation);
		let response = self
			.authorized(
				self.http_client
					.patch(format!("{}/{}", self.rest_url, table))
					.query(&[
						("address", format!("in.({})", addresses.iter().join(","))),
						("is_closed", "is.false".to_string()),
						("select", "address".to_string()),
					])
					.header("Prefer", RETURN_ROWS),
			)
			.json(&ClosePatch {
				is_closed: true,
				closed_at,
			})
			.send()
			.await?;
		let body = Self::check(response).await?.bytes().await?;
		let rows: Vec<IgnoredAny> = serde_json::from_slice(&body)?;
		debug!("Marked {} of {} addresses closed in {}", rows.len(), addresses.len(), table);

		Ok(rows.len())
	}

	async fn read_checkpoint(&self) -> Result<Checkpoint, StoreError> {
		let response = self
			.authorized(
				self.http_client
					.get(format!("{}/{}", self.rest_url, STATE_TABLE))
					.query(&[
						("id", format!("eq.{}", STATE_ROW_ID)),
						(
							"select",
							"last_processed_signature,last_processed_slot,last_run_at".to_string(),
						),
					]),
			)
			.send()
			.await?;
		let body = Self::check(response).await?.bytes().await?;
		let rows: Vec<StateRow> = serde_json::from_slice(&body)?;

		Ok(rows
			.into_iter()
			.next()
			.map(|row| Checkpoint {
				last_signature: row.last_processed_signature.filter(|s| !s.is_empty()),
				last_slot: row.last_processed_slot.unwrap_or(0),
				last_run_at: row.last_run_at,
			})
			.unwrap_or_default())
	}

	async fn write_checkpoint(
		&self,
		signature: Option<&str>,
		slot: u64,
		run_at: DateTime<Utc>,
	) -> Result<(), StoreError> {
		let row = StateRow {
			id: STATE_ROW_ID,
			last_processed_signature: signature.map(str::to_string),
			last_processed_slot: Some(slot),
			last_run_at: Some(run_at),
		};

		let response = self
			.upsert_request(STATE_TABLE, "id")
			.json(&[row])
			.send()
			.await?;
		Self::check(response).await?;

		Ok(())
	}

	fn name(&self) -> &'static str {
		"PostgrestStore"
	}
}
