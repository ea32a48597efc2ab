//! Key-casing normalization for JSON payloads crossing the client boundary.
//!
//! Outgoing bodies are rewritten from the local casing to the wire casing before they are
//! serialized; incoming bodies are rewritten from the wire casing to the local casing before
//! they reach the caller. Only object keys change; string values are never touched.

// crates.io
use heck::{ToLowerCamelCase, ToSnakeCase};
// self
use crate::_prelude::*;

/// Casing convention for JSON object keys.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyCase {
	/// `first_name`
	#[default]
	Snake,
	/// `firstName`
	Camel,
	/// Keys pass through unchanged.
	Preserve,
}
impl KeyCase {
	/// Converts a single key into this casing.
	pub fn convert(self, key: &str) -> String {
		match self {
			KeyCase::Snake => to_snake_case(key),
			KeyCase::Camel => to_camel_case(key),
			KeyCase::Preserve => key.to_owned(),
		}
	}

	/// Rewrites every object key in `value`, recursing through arrays and nested objects.
	pub fn apply(self, value: Value) -> Value {
		if matches!(self, KeyCase::Preserve) {
			return value;
		}

		match value {
			Value::Object(map) => Value::Object(
				map.into_iter().map(|(key, value)| (self.convert(&key), self.apply(value))).collect(),
			),
			Value::Array(items) => Value::Array(items.into_iter().map(|v| self.apply(v)).collect()),
			other => other,
		}
	}
}
impl FromStr for KeyCase {
	type Err = UnknownKeyCase;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"snake" | "snake_case" => Ok(KeyCase::Snake),
			"camel" | "camelcase" => Ok(KeyCase::Camel),
			"preserve" | "none" => Ok(KeyCase::Preserve),
			_ => Err(UnknownKeyCase(s.to_owned())),
		}
	}
}

/// Error returned when a casing name is not recognized.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Unknown key casing `{0}`.")]
pub struct UnknownKeyCase(pub String);

/// Pair of casings applied at the client boundary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseConvention {
	/// Casing the backend speaks.
	pub wire: KeyCase,
	/// Casing handed to (and accepted from) callers.
	pub local: KeyCase,
}
impl CaseConvention {
	/// Creates a convention from explicit wire and local casings.
	pub fn new(wire: KeyCase, local: KeyCase) -> Self {
		Self { wire, local }
	}

	/// Normalizes an outgoing body to the wire casing.
	///
	/// Every key is rewritten, whatever the local casing. Conversion is idempotent, so caller
	/// bodies in the local casing and the crate's snake-case payloads take the same path.
	pub fn outgoing(&self, value: Value) -> Value {
		self.wire.apply(value)
	}

	/// Normalizes an incoming body to the local casing; untouched when both casings match.
	pub fn incoming(&self, value: Value) -> Value {
		if self.wire == self.local { value } else { self.local.apply(value) }
	}
}

/// `firstName` → `first_name`, `HTTPStatus` → `http_status`, `user-id` → `user_id`.
pub fn to_snake_case(key: &str) -> String {
	convert_key(key, <str as ToSnakeCase>::to_snake_case)
}

/// `first_name` → `firstName`; leading underscores are kept.
pub fn to_camel_case(key: &str) -> String {
	convert_key(key, <str as ToLowerCamelCase>::to_lower_camel_case)
}

fn convert_key(key: &str, convert: fn(&str) -> String) -> String {
	let body = key.trim_start_matches('_');

	if body.is_empty() || body.parse::<f64>().is_ok() {
		return key.to_owned();
	}

	format!("{}{}", &key[..key.len() - body.len()], convert(body))
}
