//! Discriminator dispatch over the program's account variants.

use super::DecodeError;
use super::reader::{read, split_joined_vecs};
use crate::model::{AccountKind, Address};

use borsh::BorshDeserialize;

#[derive(Debug, Clone, PartialEq, Eq, BorshDeserialize)]
pub struct CredentialAccount {
	pub authority: Address,
	pub name: String,
	pub authorized_signers: Vec<Address>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaAccount {
	pub credential: Address,
	pub name: String,
	pub description: String,
	/// One type tag per payload field.
	pub layout: Vec<u8>,
	pub field_names: Vec<String>,
	pub is_paused: bool,
	pub version: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, BorshDeserialize)]
pub struct AttestationAccount {
	pub nonce: Address,
	pub credential: Address,
	pub schema: Address,
	pub data: Vec<u8>,
	pub signer: Address,
	pub expiry: i64,
	/// All-zero unless the attestation was tokenized.
	pub token_account: Address,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountRecord {
	Credential(CredentialAccount),
	Schema(SchemaAccount),
	Attestation(AttestationAccount),
}

impl AccountRecord {
	pub fn kind(&self) -> AccountKind {
		match self {
			AccountRecord::Credential(_) => AccountKind::Credential,
			AccountRecord::Schema(_) => AccountKind::Schema,
			AccountRecord::Attestation(_) => AccountKind::Attestation,
		}
	}
}

/// Outcome of decoding raw account bytes.
///
/// `Unrecognized` covers variants this decoder does not mirror and is expected during a sweep;
/// `Corrupt` means the tag was known but the body did not parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountDecode {
	Decoded(AccountRecord),
	Unrecognized(u8),
	Corrupt {
		kind: Option<AccountKind>,
		error: DecodeError,
	},
}

pub fn decode_account(data: &[u8]) -> AccountDecode {
	let Some(&tag) = data.first() else {
		return AccountDecode::Corrupt {
			kind: None,
			error: DecodeError::Empty,
		};
	};
	let Some(kind) = AccountKind::from_discriminator(tag) else {
		return AccountDecode::Unrecognized(tag);
	};

	// Accounts may be allocated larger than their contents, so trailing bytes are not an error.
	let mut body = &data[1..];
	let result = match kind {
		AccountKind::Credential => read(&mut body, "credential").map(AccountRecord::Credential),
		AccountKind::Schema => read_schema(&mut body).map(AccountRecord::Schema),
		AccountKind::Attestation => read(&mut body, "attestation").map(AccountRecord::Attestation),
	};

	match result {
		Ok(record) => AccountDecode::Decoded(record),
		Err(error) => AccountDecode::Corrupt {
			kind: Some(kind),
			error,
		},
	}
}

/// Record or nothing; unknown variants and malformed bodies both yield `None`.
pub fn decode(data: &[u8]) -> Option<AccountRecord> {
	match decode_account(data) {
		AccountDecode::Decoded(record) => Some(record),
		_ => None,
	}
}

/// On-chain field order of a schema account, before field names are split and the pause flag is
/// interpreted.
#[derive(BorshDeserialize)]
struct SchemaLayout {
	credential: Address,
	name: String,
	description: String,
	layout: Vec<u8>,
	field_names: Vec<u8>,
	is_paused: u8,
	version: u8,
}

fn read_schema(body: &mut &[u8]) -> Result<SchemaAccount, DecodeError> {
	let raw: SchemaLayout = read(body, "schema")?;
	let field_names = split_joined_vecs(&raw.field_names, "schema field name")?;

	Ok(SchemaAccount {
		credential: raw.credential,
		name: raw.name,
		description: raw.description,
		layout: raw.layout,
		field_names,
		is_paused: raw.is_paused == 1,
		version: raw.version,
	})
}
