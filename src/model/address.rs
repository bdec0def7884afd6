//! 32-byte account addresses rendered as base58 strings.

use borsh::{BorshDeserialize, BorshSerialize};
use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Length in bytes of an on-chain address.
pub const ADDRESS_LEN: usize = 32;

/// An on-chain account address.
///
/// The all-zero address (`11111111111111111111111111111111`) doubles as the "unset" marker in
/// account layouts, which is why `Default` yields it.
#[derive(
	Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, BorshSerialize, BorshDeserialize,
)]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
	pub const fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
		Self(bytes)
	}

	pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
		&self.0
	}

	/// True for the all-zero address.
	pub fn is_unset(&self) -> bool {
		self.0 == [0u8; ADDRESS_LEN]
	}

	/// Whether the bytes decompress to a point on the ed25519 curve.
	///
	/// Program-derived addresses are constructed to fall off the curve, so an authority that is
	/// not on the curve can only be signed for by a program.
	pub fn is_on_curve(&self) -> bool {
		VerifyingKey::from_bytes(&self.0).is_ok()
	}
}

impl From<[u8; ADDRESS_LEN]> for Address {
	fn from(bytes: [u8; ADDRESS_LEN]) -> Self {
		Self(bytes)
	}
}

impl fmt::Display for Address {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&bs58::encode(self.0).into_string())
	}
}

impl fmt::Debug for Address {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Address({})", self)
	}
}

/// Error returned when a string is not a base58 encoded 32-byte address.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressParseError {
	#[error("invalid base58: {0}")]
	Base58(String),

	#[error("expected {ADDRESS_LEN} bytes, got {0}")]
	Length(usize),
}

impl FromStr for Address {
	type Err = AddressParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let bytes = bs58::decode(s)
			.into_vec()
			.map_err(|e| AddressParseError::Base58(e.to_string()))?;
		let bytes: [u8; ADDRESS_LEN] = bytes
			.try_into()
			.map_err(|v: Vec<u8>| AddressParseError::Length(v.len()))?;
		Ok(Self(bytes))
	}
}

impl Serialize for Address {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.collect_str(self)
	}
}

impl<'de> Deserialize<'de> for Address {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let s = <String as Deserialize>::deserialize(deserializer)?;
		s.parse().map_err(serde::de::Error::custom)
	}
}
