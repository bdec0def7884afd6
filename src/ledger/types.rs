//! Types for the ledger query surface and the JSON-RPC payloads behind it.

use crate::model::{Address, AddressParseError};

use serde::{Deserialize, Serialize};

/// A program-owned account and its raw data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramAccount {
	pub address: Address,
	pub data: Vec<u8>,
}

/// A transaction signature touching the program, with the slot it landed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureInfo {
	pub signature: String,
	pub slot: u64,
}

/// Snapshot of the newest ledger position relevant to the program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerHead {
	pub slot: u64,
	/// Newest program transaction; `None` if the program has none yet.
	pub signature: Option<String>,
}

/// JSON-RPC 2.0 response envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct RpcResponse<T> {
	pub result: Option<T>,
	pub error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RpcErrorObject {
	pub code: i64,
	pub message: String,
}

/// Entry of a `getProgramAccounts` result.
#[derive(Debug, Deserialize)]
pub(crate) struct RpcKeyedAccount {
	pub pubkey: String,
	pub account: RpcAccount,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RpcAccount {
	/// `[payload, encoding]`.
	pub data: (String, String),
}

/// Entry of a `getSignaturesForAddress` result.
#[derive(Debug, Deserialize)]
pub(crate) struct RpcSignatureInfo {
	pub signature: String,
	pub slot: u64,
}

/// The subset of a `getTransaction` result the change detector reads.
#[derive(Debug, Deserialize)]
pub(crate) struct RpcTransaction {
	pub transaction: RpcTransactionBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RpcTransactionBody {
	pub message: RpcMessage,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RpcMessage {
	pub account_keys: Vec<String>,
}

/// Error types for ledger queries
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
	#[error("HTTP error: {0}")]
	HttpError(#[from] reqwest::Error),

	#[error("HTTP status {0}")]
	HttpStatus(u16),

	#[error("JSON parse error: {0}")]
	JsonError(#[from] serde_json::Error),

	#[error("RPC error {code}: {message}")]
	RpcError { code: i64, message: String },

	#[error("No data returned for {0}")]
	NoData(&'static str),

	#[error("Transaction {0} not found")]
	TransactionNotFound(String),

	#[error("Invalid address: {0}")]
	InvalidAddress(#[from] AddressParseError),

	#[error("Invalid account data: {0}")]
	InvalidAccountData(String),
}
