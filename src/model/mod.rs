//! Shared data model: addresses, mirrored rows and the synchronization checkpoint.

mod address;
mod checkpoint;
mod records;

pub use address::{ADDRESS_LEN, Address, AddressParseError};
pub use checkpoint::Checkpoint;
pub use records::{AccountKind, Attestation, Credential, MirrorRecord, Schema};
