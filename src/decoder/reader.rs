//! Borsh reads over a borrowed byte cursor.
//!
//! Readers take `&mut &[u8]` and advance it past what they consumed; trailing bytes are left for
//! the caller to judge.

use super::DecodeError;

use borsh::BorshDeserialize;

/// Read one `T` off the front of `input`; `context` names the value in the error.
pub fn read<T: BorshDeserialize>(
	input: &mut &[u8],
	context: &'static str,
) -> Result<T, DecodeError> {
	T::deserialize(input).map_err(|e| DecodeError::malformed(context, e))
}

/// Split a blob of back-to-back length-prefixed sub-vectors into its parts.
pub fn split_joined_vecs<T: BorshDeserialize>(
	bytes: &[u8],
	context: &'static str,
) -> Result<Vec<T>, DecodeError> {
	let mut rest = bytes;
	let mut parts = Vec::new();
	while !rest.is_empty() {
		parts.push(read(&mut rest, context)?);
	}
	Ok(parts)
}
