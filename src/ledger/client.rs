//!
//! JSON-RPC client for the ledger node.
//!
//! This module provides an async client implementing [`LedgerSource`] over the node's HTTP
//! JSON-RPC endpoint. Every query uses `confirmed` commitment so that full scans, signature pages
//! and transaction lookups observe the same view of the ledger.

use super::LedgerSource;
use super::types::*;
use crate::model::Address;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

const COMMITMENT: &str = "confirmed";

/// Ledger JSON-RPC client
pub struct SolanaRpcClient {
	/// The underlying HTTP client for RPC calls.
	http_client: Client,
	/// The JSON-RPC endpoint.
	rpc_url: String,
	/// Monotonic JSON-RPC request id.
	next_id: AtomicU64,
}

impl SolanaRpcClient {
	/// Create a new RPC client.
	///
	/// # Arguments
	/// * `rpc_url` - The HTTP JSON-RPC endpoint.
	/// * `timeout` - Per-request timeout.
	pub fn new(rpc_url: String, timeout: Duration) -> Result<Self, LedgerError> {
		let http_client = Client::builder().timeout(timeout).build()?;

		Ok(Self {
			http_client,
			rpc_url,
			next_id: AtomicU64::new(1),
		})
	}

	/// Execute a JSON-RPC call and deserialize its `result`.
	///
	/// # Errors
	/// Returns `LedgerError::RpcError` for an error object, `LedgerError::NoData` for a null
	/// result, and transport or parse errors otherwise.
	pub async fn execute_rpc<T: DeserializeOwned>(
		&self,
		method: &'static str,
		params: Value,
	) -> Result<T, LedgerError> {
		let request_body = json!({
			"jsonrpc": "2.0",
			"id": self.next_id.fetch_add(1, Ordering::Relaxed),
			"method": method,
			"params": params,
		});

		debug!("RPC {} {}", method, params_summary(&request_body));

		let response = self
			.http_client
			.post(&self.rpc_url)
			.header("Content-Type", "application/json")
			.json(&request_body)
			.send()
			.await?;

		if !response.status().is_success() {
			return Err(LedgerError::HttpStatus(response.status().as_u16()));
		}

		let body: RpcResponse<T> = serde_json::from_slice(&response.bytes().await?)?;

		if let Some(error) = body.error {
			return Err(LedgerError::RpcError {
				code: error.code,
				message: error.message,
			});
		}

		body.result.ok_or(LedgerError::NoData(method))
	}
}

fn params_summary(request_body: &Value) -> String {
	request_body
		.get("params")
		.map(Value::to_string)
		.unwrap_or_default()
}

#[async_trait::async_trait]
impl LedgerSource for SolanaRpcClient {
	async fn accounts_by_discriminator(
		&self,
		program_id: &Address,
		discriminator: u8,
	) -> Result<Vec<ProgramAccount>, LedgerError> {
		let filter_bytes = bs58::encode([discriminator]).into_string();
		let params = json!([
			program_id.to_string(),
			{
				"commitment": COMMITMENT,
				"encoding": "base64",
				"filters": [{ "memcmp": { "offset": 0, "bytes": filter_bytes } }],
			}
		]);

		let accounts: Vec<RpcKeyedAccount> = self.execute_rpc("getProgramAccounts", params).await?;

		accounts
			.into_iter()
			.map(|keyed| {
				let (payload, encoding) = keyed.account.data;
				if encoding != "base64" {
					return Err(LedgerError::InvalidAccountData(format!(
						"unexpected encoding {} for {}",
						encoding, keyed.pubkey
					)));
				}
				let data = BASE64.decode(payload).map_err(|e| {
					LedgerError::InvalidAccountData(format!("{}: {}", keyed.pubkey, e))
				})?;
				Ok(ProgramAccount {
					address: keyed.pubkey.parse()?,
					data,
				})
			})
			.collect()
	}

	async fn recent_signatures(
		&self,
		program_id: &Address,
		limit: usize,
	) -> Result<Vec<SignatureInfo>, LedgerError> {
		let params = json!([
			program_id.to_string(),
			{ "limit": limit, "commitment": COMMITMENT }
		]);

		let signatures: Vec<RpcSignatureInfo> =
			self.execute_rpc("getSignaturesForAddress", params).await?;

		Ok(signatures
			.into_iter()
			.map(|s| SignatureInfo {
				signature: s.signature,
				slot: s.slot,
			})
			.collect())
	}

	async fn transaction_account_refs(&self, signature: &str) -> Result<Vec<Address>, LedgerError> {
		let params = json!([
			signature,
			{
				"commitment": COMMITMENT,
				"encoding": "json",
				"maxSupportedTransactionVersion": 0,
			}
		]);

		let transaction: RpcTransaction = self
			.execute_rpc("getTransaction", params)
			.await
			.map_err(|e| match e {
				LedgerError::NoData(_) => LedgerError::TransactionNotFound(signature.to_string()),
				other => other,
			})?;

		transaction
			.transaction
			.message
			.account_keys
			.iter()
			.map(|key| key.parse().map_err(LedgerError::from))
			.collect()
	}

	async fn current_head(&self, program_id: &Address) -> Result<LedgerHead, LedgerError> {
		if let Some(newest) = self.recent_signatures(program_id, 1).await?.into_iter().next() {
			return Ok(LedgerHead {
				slot: newest.slot,
				signature: Some(newest.signature),
			});
		}

		let slot: u64 = self
			.execute_rpc("getSlot", json!([{ "commitment": COMMITMENT }]))
			.await?;
		Ok(LedgerHead {
			slot,
			signature: None,
		})
	}
}
