//! Runtime-typed decoding of attestation payloads.
//!
//! A schema describes its payload as parallel lists of type tags and field names. The record
//! type only exists at ingestion time, so decoded values are held as [`FieldValue`]s.

use super::reader::read;
use super::{DecodeError, SchemaAccount};

use serde::{Serialize, Serializer};
use tracing::{debug, warn};

/// Highest layout tag the program defines.
pub const MAX_LAYOUT_TAG: u8 = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
	U8,
	U16,
	U32,
	U64,
	U128,
	I8,
	I16,
	I32,
	I64,
	I128,
	Bool,
	/// Four raw bytes.
	Char,
	String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
	Scalar(ScalarType),
	Vec(ScalarType),
}

impl FieldType {
	pub fn from_tag(tag: u8) -> Result<Self, DecodeError> {
		use ScalarType::*;

		let field_type = match tag {
			0 => FieldType::Scalar(U8),
			1 => FieldType::Scalar(U16),
			2 => FieldType::Scalar(U32),
			3 => FieldType::Scalar(U64),
			4 => FieldType::Scalar(U128),
			5 => FieldType::Scalar(I8),
			6 => FieldType::Scalar(I16),
			7 => FieldType::Scalar(I32),
			8 => FieldType::Scalar(I64),
			9 => FieldType::Scalar(I128),
			10 => FieldType::Scalar(Bool),
			11 => FieldType::Scalar(Char),
			12 => FieldType::Scalar(String),
			13 => FieldType::Vec(U8),
			14 => FieldType::Vec(U16),
			15 => FieldType::Vec(U32),
			16 => FieldType::Vec(U64),
			17 => FieldType::Vec(U128),
			18 => FieldType::Vec(I8),
			19 => FieldType::Vec(I16),
			20 => FieldType::Vec(I32),
			21 => FieldType::Vec(I64),
			22 => FieldType::Vec(I128),
			23 => FieldType::Vec(Bool),
			24 => FieldType::Vec(String),
			// Deployed layouts use 25 for a single char, same wire shape as 11.
			25 => FieldType::Scalar(Char),
			other => return Err(DecodeError::UnknownLayoutTag(other)),
		};
		Ok(field_type)
	}
}

/// A single decoded payload value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
	U8(u8),
	U16(u16),
	U32(u32),
	U64(u64),
	U128(u128),
	I8(i8),
	I16(i16),
	I32(i32),
	I64(i64),
	I128(i128),
	Bool(bool),
	Char([u8; 4]),
	String(String),
	Vec(Vec<FieldValue>),
}

impl Serialize for FieldValue {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		match self {
			FieldValue::U8(v) => serializer.serialize_u8(*v),
			FieldValue::U16(v) => serializer.serialize_u16(*v),
			FieldValue::U32(v) => serializer.serialize_u32(*v),
			FieldValue::I8(v) => serializer.serialize_i8(*v),
			FieldValue::I16(v) => serializer.serialize_i16(*v),
			FieldValue::I32(v) => serializer.serialize_i32(*v),
			// Wider than 53 bits: decimal text.
			FieldValue::U64(v) => serializer.collect_str(v),
			FieldValue::U128(v) => serializer.collect_str(v),
			FieldValue::I64(v) => serializer.collect_str(v),
			FieldValue::I128(v) => serializer.collect_str(v),
			FieldValue::Bool(v) => serializer.serialize_bool(*v),
			FieldValue::Char(bytes) => bytes.serialize(serializer),
			FieldValue::String(v) => serializer.serialize_str(v),
			FieldValue::Vec(items) => serializer.collect_seq(items),
		}
	}
}

/// Decoded payload fields in layout order; serializes as a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedFields(Vec<(String, FieldValue)>);

impl DecodedFields {
	pub fn get(&self, name: &str) -> Option<&FieldValue> {
		self.0.iter().find(|(n, _)| n == name).map(|(_, v)| v)
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
		self.0.iter().map(|(n, v)| (n.as_str(), v))
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl Serialize for DecodedFields {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.collect_map(self.0.iter().map(|(n, v)| (n, v)))
	}
}

fn read_scalar(input: &mut &[u8], ty: ScalarType) -> Result<FieldValue, DecodeError> {
	let value = match ty {
		ScalarType::U8 => FieldValue::U8(read(input, "u8 field")?),
		ScalarType::U16 => FieldValue::U16(read(input, "u16 field")?),
		ScalarType::U32 => FieldValue::U32(read(input, "u32 field")?),
		ScalarType::U64 => FieldValue::U64(read(input, "u64 field")?),
		ScalarType::U128 => FieldValue::U128(read(input, "u128 field")?),
		ScalarType::I8 => FieldValue::I8(read(input, "i8 field")?),
		ScalarType::I16 => FieldValue::I16(read(input, "i16 field")?),
		ScalarType::I32 => FieldValue::I32(read(input, "i32 field")?),
		ScalarType::I64 => FieldValue::I64(read(input, "i64 field")?),
		ScalarType::I128 => FieldValue::I128(read(input, "i128 field")?),
		ScalarType::Bool => FieldValue::Bool(read(input, "bool field")?),
		ScalarType::Char => FieldValue::Char(read(input, "char field")?),
		ScalarType::String => FieldValue::String(read(input, "string field")?),
	};
	Ok(value)
}

fn read_field(input: &mut &[u8], ty: FieldType) -> Result<FieldValue, DecodeError> {
	match ty {
		FieldType::Scalar(scalar) => read_scalar(input, scalar),
		FieldType::Vec(scalar) => {
			let count: u32 = read(input, "vector length")?;
			// Every element takes at least one byte, which bounds a hostile count.
			let mut items = Vec::with_capacity((count as usize).min(input.len()));
			for _ in 0..count {
				items.push(read_scalar(input, scalar)?);
			}
			Ok(FieldValue::Vec(items))
		}
	}
}

/// Decode `payload` against the record type described by `layout` and `field_names`.
pub fn try_decode_fields(
	layout: &[u8],
	field_names: &[String],
	payload: &[u8],
) -> Result<DecodedFields, DecodeError> {
	if layout.len() != field_names.len() {
		return Err(DecodeError::LayoutMismatch {
			layout: layout.len(),
			field_names: field_names.len(),
		});
	}

	let types = layout
		.iter()
		.map(|tag| FieldType::from_tag(*tag))
		.collect::<Result<Vec<_>, _>>()?;

	let mut input = payload;
	let mut fields = Vec::with_capacity(types.len());
	for (name, ty) in field_names.iter().zip(types) {
		fields.push((name.clone(), read_field(&mut input, ty)?));
	}

	if !input.is_empty() {
		debug!(
			"Attestation payload has {} trailing bytes after {} fields",
			input.len(),
			fields.len()
		);
	}

	Ok(DecodedFields(fields))
}

/// Decode an attestation payload with its schema, or `None` with a logged diagnostic.
pub fn decode_attestation_data(schema: &SchemaAccount, payload: &[u8]) -> Option<DecodedFields> {
	match try_decode_fields(&schema.layout, &schema.field_names, payload) {
		Ok(fields) => Some(fields),
		Err(e) => {
			warn!("Failed to decode attestation data for schema {:?}: {}", schema.name, e);
			None
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::Address;
	use pretty_assertions::assert_eq;
	use serde_json::json;

	fn schema(layout: Vec<u8>, names: &[&str]) -> SchemaAccount {
		SchemaAccount {
			credential: Address::default(),
			name: "test".to_string(),
			description: String::new(),
			layout,
			field_names: names.iter().map(|n| n.to_string()).collect(),
			is_paused: false,
			version: 1,
		}
	}

	fn encode_scalar(value: &FieldValue, out: &mut Vec<u8>) {
		let bytes = match value {
			FieldValue::U8(v) => borsh::to_vec(v),
			FieldValue::U16(v) => borsh::to_vec(v),
			FieldValue::U32(v) => borsh::to_vec(v),
			FieldValue::U64(v) => borsh::to_vec(v),
			FieldValue::U128(v) => borsh::to_vec(v),
			FieldValue::I8(v) => borsh::to_vec(v),
			FieldValue::I16(v) => borsh::to_vec(v),
			FieldValue::I32(v) => borsh::to_vec(v),
			FieldValue::I64(v) => borsh::to_vec(v),
			FieldValue::I128(v) => borsh::to_vec(v),
			FieldValue::Bool(v) => borsh::to_vec(v),
			FieldValue::Char(bytes) => borsh::to_vec(bytes),
			FieldValue::String(s) => borsh::to_vec(s),
			FieldValue::Vec(items) => {
				out.extend_from_slice(&(items.len() as u32).to_le_bytes());
				for item in items {
					encode_scalar(item, out);
				}
				return;
			}
		};
		out.extend(bytes.unwrap());
	}

	/// One representative value per layout tag, indexed by tag.
	fn sample_values() -> Vec<FieldValue> {
		use FieldValue as V;
		vec![
			V::U8(200),
			V::U16(60_000),
			V::U32(4_000_000_000),
			V::U64(u64::MAX),
			V::U128(u128::MAX - 7),
			V::I8(-100),
			V::I16(-30_000),
			V::I32(-2_000_000_000),
			V::I64(-(1 << 60) - 3),
			V::I128(i128::MIN + 1),
			V::Bool(true),
			V::Char(*b"abcd"),
			V::String("héllo".to_string()),
			V::Vec(vec![V::U8(1), V::U8(255)]),
			V::Vec(vec![V::U16(2), V::U16(65_535)]),
			V::Vec(vec![V::U32(3)]),
			V::Vec(vec![V::U64(9_007_199_254_740_993)]),
			V::Vec(vec![V::U128(1 << 100), V::U128(0)]),
			V::Vec(vec![V::I8(-1), V::I8(1)]),
			V::Vec(vec![V::I16(-2)]),
			V::Vec(vec![V::I32(-3), V::I32(i32::MAX)]),
			V::Vec(vec![V::I64(i64::MIN)]),
			V::Vec(vec![V::I128(-(1 << 90))]),
			V::Vec(vec![V::Bool(false), V::Bool(true)]),
			V::Vec(vec![V::String("a".into()), V::String(String::new())]),
			V::Char([0xf0, 0x9f, 0x98, 0x80]),
		]
	}

	#[test]
	fn every_layout_tag_round_trips() {
		let values = sample_values();
		assert_eq!(values.len(), MAX_LAYOUT_TAG as usize + 1);

		for (tag, value) in values.iter().enumerate() {
			let mut payload = Vec::new();
			encode_scalar(value, &mut payload);
			let decoded = decode_attestation_data(&schema(vec![tag as u8], &["f"]), &payload)
				.unwrap_or_else(|| panic!("tag {tag} failed to decode"));
			assert_eq!(decoded.get("f"), Some(value), "tag {tag}");
		}
	}

	#[test]
	fn whole_record_decodes_in_layout_order() {
		let values = sample_values();
		let names: Vec<String> = (0..values.len()).map(|i| format!("field_{i}")).collect();
		let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
		let mut payload = Vec::new();
		for value in &values {
			encode_scalar(value, &mut payload);
		}

		let layout = (0..=MAX_LAYOUT_TAG).collect();
		let decoded = decode_attestation_data(&schema(layout, &name_refs), &payload).unwrap();
		let decoded_names: Vec<&str> = decoded.iter().map(|(n, _)| n).collect();
		assert_eq!(decoded_names, name_refs);
		assert_eq!(decoded.len(), values.len());
	}

	#[test]
	fn wide_integers_serialize_as_decimal_text() {
		let fields = DecodedFields(vec![
			("small".into(), FieldValue::U32(7)),
			("big".into(), FieldValue::U64(9_007_199_254_740_993)),
			("huge".into(), FieldValue::I128(i128::MIN)),
			("list".into(), FieldValue::Vec(vec![FieldValue::U128(u128::MAX)])),
			("ch".into(), FieldValue::Char(*b"wxyz")),
		]);
		let value = serde_json::to_value(&fields).unwrap();
		assert_eq!(
			value,
			json!({
				"small": 7,
				"big": "9007199254740993",
				"huge": "-170141183460469231731687303715884105728",
				"list": ["340282366920938463463374607431768211455"],
				"ch": [119, 120, 121, 122],
			})
		);
	}

	#[test]
	fn mismatched_layout_and_names_yield_none() {
		assert_eq!(decode_attestation_data(&schema(vec![0, 0], &["only"]), &[1, 2]), None);
		assert_eq!(
			try_decode_fields(&[0], &[], &[1]),
			Err(DecodeError::LayoutMismatch { layout: 1, field_names: 0 })
		);
	}

	#[test]
	fn out_of_range_tag_yields_none() {
		assert_eq!(decode_attestation_data(&schema(vec![26], &["x"]), &[0; 16]), None);
		assert_eq!(FieldType::from_tag(255), Err(DecodeError::UnknownLayoutTag(255)));
	}

	#[test]
	fn truncated_payload_yields_none() {
		assert_eq!(decode_attestation_data(&schema(vec![3], &["n"]), &[1, 2, 3]), None);
		// Vector claims more elements than the payload holds.
		let payload = [5u8, 0, 0, 0, 1, 2];
		assert_eq!(decode_attestation_data(&schema(vec![13], &["v"]), &payload), None);
	}

	#[test]
	fn invalid_bool_byte_is_rejected() {
		assert!(matches!(
			try_decode_fields(&[10], &["b".to_string()], &[2]),
			Err(DecodeError::Malformed {
				context: "bool field",
				..
			})
		));
	}

	#[test]
	fn invalid_utf8_string_is_rejected() {
		let payload = [2u8, 0, 0, 0, 0xff, 0xfe];
		assert!(matches!(
			try_decode_fields(&[12], &["s".to_string()], &payload),
			Err(DecodeError::Malformed {
				context: "string field",
				..
			})
		));
	}

	#[test]
	fn trailing_bytes_are_tolerated() {
		let decoded = decode_attestation_data(&schema(vec![0], &["a"]), &[9, 9, 9]).unwrap();
		assert_eq!(decoded.get("a"), Some(&FieldValue::U8(9)));
	}
}
