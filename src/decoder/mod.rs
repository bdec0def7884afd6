//! Account decoder for the attestation program.
//!
//! Pure byte-to-record translation. Byte 0 of every account selects its variant; the remaining
//! bytes are Borsh: public keys, u32 length-prefixed vectors and little-endian integers.
//! Attestation payloads are further decoded against their schema's runtime layout.
//!
//! Nothing in this module panics on malformed input; every failure is a [`DecodeError`] or a
//! `None` accompanied by a log line.

mod account;
mod error;
mod layout;
mod reader;

pub use account::{
	AccountDecode, AccountRecord, AttestationAccount, CredentialAccount, SchemaAccount, decode,
	decode_account,
};
pub use error::DecodeError;
pub use layout::{
	DecodedFields, FieldType, FieldValue, MAX_LAYOUT_TAG, ScalarType, decode_attestation_data,
	try_decode_fields,
};
pub use reader::split_joined_vecs;
