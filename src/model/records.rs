//! Row shapes written to the mirror store, keyed by account address.

use crate::decoder::DecodedFields;
use crate::model::Address;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt;

/// The three account variants mirrored from the program, in the order a pass visits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AccountKind {
	Credential,
	Schema,
	Attestation,
}

impl AccountKind {
	/// Pass order: schemas must be seen before the attestations that reference them.
	pub const ALL: [AccountKind; 3] = [
		AccountKind::Credential,
		AccountKind::Schema,
		AccountKind::Attestation,
	];

	/// Leading tag byte of accounts of this kind.
	pub const fn discriminator(self) -> u8 {
		match self {
			AccountKind::Credential => 0,
			AccountKind::Schema => 1,
			AccountKind::Attestation => 2,
		}
	}

	pub const fn from_discriminator(tag: u8) -> Option<Self> {
		match tag {
			0 => Some(AccountKind::Credential),
			1 => Some(AccountKind::Schema),
			2 => Some(AccountKind::Attestation),
			_ => None,
		}
	}

	pub const fn label(self) -> &'static str {
		match self {
			AccountKind::Credential => "credential",
			AccountKind::Schema => "schema",
			AccountKind::Attestation => "attestation",
		}
	}
}

impl fmt::Display for AccountKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.label())
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Credential {
	pub address: Address,
	pub authority: Address,
	pub name: String,
	pub authorized_signers: Vec<Address>,
	/// Authority is a program-derived (off-curve) address.
	pub is_pda_owned: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Schema {
	pub address: Address,
	pub credential_address: Address,
	pub name: String,
	pub description: String,
	pub layout: Vec<u8>,
	pub field_names: Vec<String>,
	pub is_paused: bool,
	pub version: u8,
	pub is_tokenized: bool,
	pub tokenized_mint: Option<Address>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attestation {
	pub address: Address,
	pub nonce: Address,
	pub credential_address: Address,
	pub schema_address: Address,
	#[serde(serialize_with = "serialize_bytea")]
	pub data_raw: Vec<u8>,
	pub data_decoded: Option<DecodedFields>,
	pub signer: Address,
	#[serde(serialize_with = "serialize_i64_text")]
	pub expiry: i64,
	pub is_tokenized: bool,
	/// `null` rather than the all-ones system address when the attestation is not tokenized;
	/// readers filter on `token_account is not null` or `is_tokenized`.
	pub token_account: Option<Address>,
	pub attestation_mint: Option<Address>,
	/// Set once a pass sees the account disappear after a transaction touched it.
	pub is_closed: bool,
	pub closed_at: Option<DateTime<Utc>>,
}

/// A decoded account ready to be upserted by address.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MirrorRecord {
	Credential(Credential),
	Schema(Schema),
	Attestation(Attestation),
}

impl MirrorRecord {
	pub fn address(&self) -> &Address {
		match self {
			MirrorRecord::Credential(c) => &c.address,
			MirrorRecord::Schema(s) => &s.address,
			MirrorRecord::Attestation(a) => &a.address,
		}
	}

	pub fn kind(&self) -> AccountKind {
		match self {
			MirrorRecord::Credential(_) => AccountKind::Credential,
			MirrorRecord::Schema(_) => AccountKind::Schema,
			MirrorRecord::Attestation(_) => AccountKind::Attestation,
		}
	}
}

/// Postgres `bytea` hex literal.
fn serialize_bytea<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
	serializer.serialize_str(&format!("\\x{}", hex::encode(bytes)))
}

/// 64-bit values travel as decimal text so JSON consumers never round them.
fn serialize_i64_text<S: Serializer>(value: &i64, serializer: S) -> Result<S::Ok, S::Error> {
	serializer.collect_str(value)
}
