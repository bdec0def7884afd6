#![allow(dead_code)]

use sas_state_sync::ledger::{LedgerError, LedgerHead, LedgerSource, ProgramAccount, SignatureInfo};
use sas_state_sync::model::Address;
use sas_state_sync::sync::SyncConfig;

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

pub fn key(byte: u8) -> Address {
	Address::new([byte; 32])
}

/// Public key of an ordinary keypair.
pub fn on_curve_key() -> Address {
	let verifying_key = ed25519_dalek::SigningKey::from_bytes(&[42u8; 32]).verifying_key();
	Address::new(verifying_key.to_bytes())
}

/// An address that is not a valid curve point, as program-derived addresses are.
pub fn off_curve_key() -> Address {
	let mut bytes = [0u8; 32];
	bytes[0] = 2;
	Address::new(bytes)
}

pub fn program_id() -> Address {
	key(0xaa)
}

pub fn config() -> SyncConfig {
	SyncConfig {
		program_id: program_id(),
		..SyncConfig::default()
	}
}

#[derive(Default)]
struct FakeState {
	accounts: BTreeMap<Address, Vec<u8>>,
	/// Newest first.
	signatures: Vec<SignatureInfo>,
	account_refs: HashMap<String, Vec<Address>>,
	slot: u64,
	fail_account_queries: bool,
	transaction_fetches: usize,
}

/// In-memory ledger holding raw program accounts and a transaction history.
#[derive(Default)]
pub struct FakeLedger {
	state: Mutex<FakeState>,
}

impl FakeLedger {
	pub fn new() -> Self {
		let ledger = Self::default();
		ledger.lock().slot = 1_000;
		ledger
	}

	fn lock(&self) -> MutexGuard<'_, FakeState> {
		self.state.lock().unwrap_or_else(PoisonError::into_inner)
	}

	pub fn put_account(&self, address: Address, data: Vec<u8>) {
		self.lock().accounts.insert(address, data);
	}

	/// Drop an account, as closing it on chain does.
	pub fn remove_account(&self, address: &Address) {
		self.lock().accounts.remove(address);
	}

	/// Append a transaction at `slot` touching `accounts`.
	pub fn push_transaction(&self, signature: &str, slot: u64, accounts: &[Address]) {
		let mut state = self.lock();
		state.signatures.insert(
			0,
			SignatureInfo {
				signature: signature.to_string(),
				slot,
			},
		);
		state
			.account_refs
			.insert(signature.to_string(), accounts.to_vec());
		state.slot = state.slot.max(slot);
	}

	/// Append a transaction whose details cannot be fetched.
	pub fn push_unfetchable_transaction(&self, signature: &str, slot: u64) {
		let mut state = self.lock();
		state.signatures.insert(
			0,
			SignatureInfo {
				signature: signature.to_string(),
				slot,
			},
		);
		state.slot = state.slot.max(slot);
	}

	pub fn set_slot(&self, slot: u64) {
		self.lock().slot = slot;
	}

	pub fn fail_account_queries(&self, fail: bool) {
		self.lock().fail_account_queries = fail;
	}

	pub fn transaction_fetches(&self) -> usize {
		self.lock().transaction_fetches
	}
}

#[async_trait::async_trait]
impl LedgerSource for FakeLedger {
	async fn accounts_by_discriminator(
		&self,
		_program_id: &Address,
		discriminator: u8,
	) -> Result<Vec<ProgramAccount>, LedgerError> {
		let state = self.lock();
		if state.fail_account_queries {
			return Err(LedgerError::HttpStatus(503));
		}
		Ok(state
			.accounts
			.iter()
			.filter(|(_, data)| data.first() == Some(&discriminator))
			.map(|(address, data)| ProgramAccount {
				address: *address,
				data: data.clone(),
			})
			.collect())
	}

	async fn recent_signatures(
		&self,
		_program_id: &Address,
		limit: usize,
	) -> Result<Vec<SignatureInfo>, LedgerError> {
		Ok(self.lock().signatures.iter().take(limit).cloned().collect())
	}

	async fn transaction_account_refs(&self, signature: &str) -> Result<Vec<Address>, LedgerError> {
		let mut state = self.lock();
		state.transaction_fetches += 1;
		state
			.account_refs
			.get(signature)
			.cloned()
			.ok_or_else(|| LedgerError::TransactionNotFound(signature.to_string()))
	}

	async fn current_head(&self, _program_id: &Address) -> Result<LedgerHead, LedgerError> {
		let state = self.lock();
		Ok(match state.signatures.first() {
			Some(newest) => LedgerHead {
				slot: newest.slot,
				signature: Some(newest.signature.clone()),
			},
			None => LedgerHead {
				slot: state.slot,
				signature: None,
			},
		})
	}
}

fn push_vec(out: &mut Vec<u8>, bytes: &[u8]) {
	out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
	out.extend_from_slice(bytes);
}

pub fn credential_bytes(authority: Address, name: &str, signers: &[Address]) -> Vec<u8> {
	let mut out = vec![0u8];
	out.extend_from_slice(authority.as_bytes());
	push_vec(&mut out, name.as_bytes());
	out.extend_from_slice(&(signers.len() as u32).to_le_bytes());
	for signer in signers {
		out.extend_from_slice(signer.as_bytes());
	}
	out
}

pub fn schema_bytes(credential: Address, name: &str, layout: &[u8], field_names: &[&str]) -> Vec<u8> {
	let mut out = vec![1u8];
	out.extend_from_slice(credential.as_bytes());
	push_vec(&mut out, name.as_bytes());
	push_vec(&mut out, format!("{} schema", name).as_bytes());
	push_vec(&mut out, layout);
	let mut joined = Vec::new();
	for field in field_names {
		push_vec(&mut joined, field.as_bytes());
	}
	push_vec(&mut out, &joined);
	out.push(0);
	out.push(1);
	out
}

pub struct AttestationBytes {
	pub credential: Address,
	pub schema: Address,
	pub data: Vec<u8>,
	pub expiry: i64,
	pub token_account: Address,
}

impl AttestationBytes {
	pub fn new(credential: Address, schema: Address, data: Vec<u8>) -> Self {
		Self {
			credential,
			schema,
			data,
			expiry: 0,
			token_account: Address::default(),
		}
	}

	pub fn build(&self) -> Vec<u8> {
		let mut out = vec![2u8];
		out.extend_from_slice(key(0x11).as_bytes());
		out.extend_from_slice(self.credential.as_bytes());
		out.extend_from_slice(self.schema.as_bytes());
		push_vec(&mut out, &self.data);
		out.extend_from_slice(key(0x22).as_bytes());
		out.extend_from_slice(&self.expiry.to_le_bytes());
		out.extend_from_slice(self.token_account.as_bytes());
		out
	}
}

/// Payload for a `[String, u8]` layout.
pub fn name_age_payload(name: &str, age: u8) -> Vec<u8> {
	let mut out = Vec::new();
	push_vec(&mut out, name.as_bytes());
	out.push(age);
	out
}
