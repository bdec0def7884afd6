/// Reasons account bytes or attestation payloads fail to decode.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
	#[error("empty account data")]
	Empty,

	/// Borsh rejected the bytes: short input, invalid UTF-8, a bool byte other than 0/1.
	#[error("malformed {context}: {message}")]
	Malformed {
		context: &'static str,
		message: String,
	},

	#[error("unknown layout tag {0}")]
	UnknownLayoutTag(u8),

	#[error("layout has {layout} entries but {field_names} field names")]
	LayoutMismatch { layout: usize, field_names: usize },
}

impl DecodeError {
	pub(crate) fn malformed(context: &'static str, error: borsh::io::Error) -> Self {
		DecodeError::Malformed {
			context,
			message: error.to_string(),
		}
	}
}
