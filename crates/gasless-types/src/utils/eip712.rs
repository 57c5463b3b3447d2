//! EIP-712 typed structured data hashing.
//!
//! These helpers provide:
//! - Schema descriptions and their canonical type strings
//! - Struct hashing (`keccak256(typeHash || encodeData(values))`)
//! - Final digest computation (`0x1901 || domainSeparator || structHash`)
//!
//! Only the field types the authorization protocol needs are supported. Nested
//! struct types are not, so a type string never has referenced types appended.

use alloy_primitives::{keccak256, Address, B256, U256};
use thiserror::Error;

/// Canonical type string of the domain every signature is bound to.
pub const DOMAIN_TYPE: &str =
	"EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";

/// Canonical type string of the delegated call authorization.
pub const AUTHORIZATION_TYPE: &str =
	"SomeFunc(address sender,address[] receivers,uint256 amount,uint256 deadline,uint256 nonce)";

/// Schema of the `EIP712Domain` struct, fields in signing order.
pub static DOMAIN_SCHEMA: TypeSchema = TypeSchema {
	primary_type: "EIP712Domain",
	fields: &[
		TypedField::new("name", FieldKind::String),
		TypedField::new("version", FieldKind::String),
		TypedField::new("chainId", FieldKind::Uint256),
		TypedField::new("verifyingContract", FieldKind::Address),
	],
};

/// Schema of the `SomeFunc` authorization message, fields in signing order.
pub static AUTHORIZATION_SCHEMA: TypeSchema = TypeSchema {
	primary_type: "SomeFunc",
	fields: &[
		TypedField::new("sender", FieldKind::Address),
		TypedField::new("receivers", FieldKind::AddressArray),
		TypedField::new("amount", FieldKind::Uint256),
		TypedField::new("deadline", FieldKind::Uint256),
		TypedField::new("nonce", FieldKind::Uint256),
	],
};

/// Errors raised while hashing typed data.
///
/// Both variants indicate a programming error (a schema and the values fed to
/// it disagree), never a condition caused by untrusted input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Eip712Error {
	/// The schema itself is unusable.
	#[error("Invalid type schema '{type_name}': {message}")]
	InvalidSchema { type_name: String, message: String },
	/// The values do not have the shape the schema declares.
	#[error("Schema mismatch for '{type_name}': {message}")]
	SchemaMismatch { type_name: String, message: String },
}

/// Solidity types a schema field may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
	/// `address`
	Address,
	/// `address[]`
	AddressArray,
	/// `uint256`
	Uint256,
	/// `string`
	String,
	/// `bytes32`
	Bytes32,
}

impl FieldKind {
	/// Returns the Solidity type name used in the canonical type string.
	pub fn solidity_type(&self) -> &'static str {
		match self {
			FieldKind::Address => "address",
			FieldKind::AddressArray => "address[]",
			FieldKind::Uint256 => "uint256",
			FieldKind::String => "string",
			FieldKind::Bytes32 => "bytes32",
		}
	}
}

/// A named, typed member of a struct schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypedField {
	pub name: &'static str,
	pub kind: FieldKind,
}

impl TypedField {
	pub const fn new(name: &'static str, kind: FieldKind) -> Self {
		Self { name, kind }
	}
}

/// An ordered field list under a primary type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeSchema {
	pub primary_type: &'static str,
	pub fields: &'static [TypedField],
}

impl TypeSchema {
	/// Renders the canonical encoding, e.g. `Mail(address from,string contents)`.
	pub fn encode_type(&self) -> String {
		let members = self
			.fields
			.iter()
			.map(|f| format!("{} {}", f.kind.solidity_type(), f.name))
			.collect::<Vec<_>>()
			.join(",");
		format!("{}({})", self.primary_type, members)
	}

	/// Returns `keccak256(encode_type())`.
	pub fn type_hash(&self) -> B256 {
		keccak256(self.encode_type().as_bytes())
	}

	/// Checks the schema is well formed: named, non-empty, unique field names.
	pub fn validate(&self) -> Result<(), Eip712Error> {
		let invalid = |message: String| Eip712Error::InvalidSchema {
			type_name: self.primary_type.to_string(),
			message,
		};

		if self.primary_type.is_empty() {
			return Err(invalid("primary type name is empty".into()));
		}
		if self.fields.is_empty() {
			return Err(invalid("schema declares no fields".into()));
		}
		for (i, field) in self.fields.iter().enumerate() {
			if field.name.is_empty() {
				return Err(invalid(format!("field {} has no name", i)));
			}
			if self.fields[..i].iter().any(|f| f.name == field.name) {
				return Err(invalid(format!("duplicate field '{}'", field.name)));
			}
		}
		Ok(())
	}
}

/// A concrete value for one schema field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eip712Value {
	Address(Address),
	AddressArray(Vec<Address>),
	Uint256(U256),
	String(String),
	Bytes32(B256),
}

impl Eip712Value {
	pub fn kind(&self) -> FieldKind {
		match self {
			Eip712Value::Address(_) => FieldKind::Address,
			Eip712Value::AddressArray(_) => FieldKind::AddressArray,
			Eip712Value::Uint256(_) => FieldKind::Uint256,
			Eip712Value::String(_) => FieldKind::String,
			Eip712Value::Bytes32(_) => FieldKind::Bytes32,
		}
	}
}

/// A message that can be hashed as an EIP-712 struct.
pub trait TypedMessage {
	/// The schema the message is signed under.
	fn schema(&self) -> &'static TypeSchema;

	/// Field values in schema order.
	fn values(&self) -> Vec<Eip712Value>;

	/// Computes `hashStruct(message)`.
	fn struct_hash(&self) -> Result<B256, Eip712Error> {
		hash_struct(self.schema(), &self.values())
	}
}

/// Computes `keccak256(typeHash || encodeData(values))` for `schema`.
pub fn hash_struct(schema: &TypeSchema, values: &[Eip712Value]) -> Result<B256, Eip712Error> {
	schema.validate()?;

	if schema.fields.len() != values.len() {
		return Err(Eip712Error::SchemaMismatch {
			type_name: schema.primary_type.to_string(),
			message: format!(
				"expected {} values, got {}",
				schema.fields.len(),
				values.len()
			),
		});
	}

	let mut enc = Eip712AbiEncoder::new();
	enc.push_b256(&schema.type_hash());
	for (field, value) in schema.fields.iter().zip(values) {
		if field.kind != value.kind() {
			return Err(Eip712Error::SchemaMismatch {
				type_name: schema.primary_type.to_string(),
				message: format!(
					"field '{}' is declared {} but got {}",
					field.name,
					field.kind.solidity_type(),
					value.kind().solidity_type()
				),
			});
		}
		enc.push_value(value);
	}
	Ok(keccak256(enc.finish()))
}

/// Compute the final EIP-712 digest: keccak256(0x1901 || domainSeparator || structHash).
pub fn compute_final_digest(domain_separator: &B256, struct_hash: &B256) -> B256 {
	let mut out = Vec::with_capacity(2 + 32 + 32);
	out.push(0x19);
	out.push(0x01);
	out.extend_from_slice(domain_separator.as_slice());
	out.extend_from_slice(struct_hash.as_slice());
	keccak256(out)
}

/// Hashes `message` and binds it to `domain_separator`.
pub fn typed_data_digest<M: TypedMessage + ?Sized>(
	domain_separator: &B256,
	message: &M,
) -> Result<B256, Eip712Error> {
	let struct_hash = message.struct_hash()?;
	Ok(compute_final_digest(domain_separator, &struct_hash))
}

/// Minimal ABI encoder producing `encodeData` words.
///
/// Every pushed value occupies exactly one 32-byte word; dynamic values
/// (strings, arrays) are replaced by their keccak256 hash per EIP-712.
pub struct Eip712AbiEncoder {
	buf: Vec<u8>,
}

impl Default for Eip712AbiEncoder {
	fn default() -> Self {
		Self::new()
	}
}

impl Eip712AbiEncoder {
	pub fn new() -> Self {
		Self { buf: Vec::new() }
	}

	pub fn push_b256(&mut self, v: &B256) {
		self.buf.extend_from_slice(v.as_slice());
	}

	pub fn push_address(&mut self, addr: &Address) {
		self.buf.extend_from_slice(&address_word(addr));
	}

	pub fn push_u256(&mut self, v: U256) {
		let word: [u8; 32] = v.to_be_bytes::<32>();
		self.buf.extend_from_slice(&word);
	}

	pub fn push_string(&mut self, s: &str) {
		self.push_b256(&keccak256(s.as_bytes()));
	}

	/// Pushes `keccak256(word(a0) || word(a1) || ...)`.
	pub fn push_address_array(&mut self, addrs: &[Address]) {
		let mut packed = Vec::with_capacity(addrs.len() * 32);
		for addr in addrs {
			packed.extend_from_slice(&address_word(addr));
		}
		self.push_b256(&keccak256(packed));
	}

	pub fn push_value(&mut self, value: &Eip712Value) {
		match value {
			Eip712Value::Address(a) => self.push_address(a),
			Eip712Value::AddressArray(a) => self.push_address_array(a),
			Eip712Value::Uint256(v) => self.push_u256(*v),
			Eip712Value::String(s) => self.push_string(s),
			Eip712Value::Bytes32(b) => self.push_b256(b),
		}
	}

	pub fn finish(self) -> Vec<u8> {
		self.buf
	}
}

fn address_word(addr: &Address) -> [u8; 32] {
	let mut word = [0u8; 32];
	word[12..].copy_from_slice(addr.as_slice());
	word
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::address;

	static BROKEN_SCHEMA: TypeSchema = TypeSchema {
		primary_type: "Broken",
		fields: &[
			TypedField::new("a", FieldKind::Uint256),
			TypedField::new("a", FieldKind::Address),
		],
	};

	#[test]
	fn test_canonical_type_strings() {
		assert_eq!(DOMAIN_SCHEMA.encode_type(), DOMAIN_TYPE);
		assert_eq!(AUTHORIZATION_SCHEMA.encode_type(), AUTHORIZATION_TYPE);
	}

	#[test]
	fn test_final_digest_prefix() {
		let domain = B256::repeat_byte(0x11);
		let message = B256::repeat_byte(0x22);

		let mut expected = vec![0x19, 0x01];
		expected.extend_from_slice(domain.as_slice());
		expected.extend_from_slice(message.as_slice());

		assert_eq!(
			compute_final_digest(&domain, &message),
			keccak256(&expected)
		);
	}

	#[test]
	fn test_address_array_hash_is_hash_of_words() {
		let a = address!("70997970C51812dc3A010C7d01b50e0d17dc79C8");
		let b = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

		let mut enc = Eip712AbiEncoder::new();
		enc.push_address_array(&[a, b]);
		let encoded = enc.finish();

		let mut words = Vec::new();
		words.extend_from_slice(&address_word(&a));
		words.extend_from_slice(&address_word(&b));
		assert_eq!(encoded, keccak256(&words).to_vec());
	}

	#[test]
	fn test_empty_address_array_hashes_empty_input() {
		let mut enc = Eip712AbiEncoder::new();
		enc.push_address_array(&[]);
		assert_eq!(enc.finish(), keccak256(b"").to_vec());
	}

	#[test]
	fn test_value_count_mismatch() {
		let err = hash_struct(&DOMAIN_SCHEMA, &[Eip712Value::String("x".into())]).unwrap_err();
		assert!(matches!(err, Eip712Error::SchemaMismatch { .. }));
	}

	#[test]
	fn test_value_kind_mismatch() {
		let values = vec![
			Eip712Value::String("Gasless".into()),
			Eip712Value::String("1".into()),
			Eip712Value::String("31337".into()),
			Eip712Value::Address(Address::ZERO),
		];
		let err = hash_struct(&DOMAIN_SCHEMA, &values).unwrap_err();
		assert!(err.to_string().contains("chainId"));
	}

	#[test]
	fn test_duplicate_field_rejected() {
		let err = BROKEN_SCHEMA.validate().unwrap_err();
		assert!(matches!(err, Eip712Error::InvalidSchema { .. }));
		assert!(err.to_string().contains("duplicate field 'a'"));
	}
}
