//! Schemas seen during a pass, keyed by address.
//!
//! Filled while the schema kind is visited (every schema the ledger returns, whether or not it is
//! in scope) and consulted while attestations are decoded.

use crate::decoder::{DecodedFields, SchemaAccount, decode_attestation_data};
use crate::model::Address;

use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Default)]
pub struct SchemaDirectory {
	schemas: HashMap<Address, SchemaAccount>,
}

impl SchemaDirectory {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn register(&mut self, address: Address, schema: SchemaAccount) {
		self.schemas.insert(address, schema);
	}

	/// Decode an attestation payload against the schema it references.
	///
	/// `None` if the schema is unknown or the payload does not fit its layout.
	pub fn resolve(&self, schema: &Address, payload: &[u8]) -> Option<DecodedFields> {
		match self.schemas.get(schema) {
			Some(account) => decode_attestation_data(account, payload),
			None => {
				debug!("Schema {} not found on ledger, leaving payload undecoded", schema);
				None
			}
		}
	}
}
