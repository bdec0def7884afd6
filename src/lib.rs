//! Mirror of the attestation service program's on-chain state.
//!
//! Credentials, schemas and attestations owned by the program are decoded from raw account bytes
//! and upserted into a relational store. The first pass scans every account; later passes only
//! revisit accounts touched by transactions newer than the stored checkpoint.

pub mod config;
pub mod decoder;
pub mod ledger;
pub mod model;
pub mod runtime;
pub mod store;
pub mod sync;
pub mod utils;
