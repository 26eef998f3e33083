//! Support for node metadata
//!
//! Every tree node carries an ordered map of key/value annotations. Values
//! are [`serde_json::Value`]s, which covers the literal forms the newick
//! annotation grammar can express: double-quoted strings, bare numbers and
//! booleans, and bracketed arrays of scalars. The map is a `BTreeMap` so
//! that serialization of the same tree is byte-identical across runs.

use std::collections::BTreeMap;

use serde_json::Value;

/// Ordered key/value annotations attached to a tree node.
pub type Metadata = BTreeMap<String, Value>;

/// Reserved metadata key holding the population label of a node.
///
/// The simulator writes it on every node it creates; all other keys are
/// user-defined and treated opaquely.
pub const STATE_KEY: &str = "state";

/// Encode a metadata value in its newick literal form.
///
/// Strings come out double-quoted, numbers and booleans bare, arrays
/// bracketed — the compact JSON rendering.
pub fn encode_value(value: &Value) -> String {
    value.to_string()
}

/// Decode a newick literal back into a metadata value.
///
/// Anything that does not parse as a JSON literal is kept verbatim as a
/// bare string, mirroring how unquoted labels appear in the wild.
pub fn decode_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_values_round_trip() {
        for raw in ["\"I\"", "1.5", "42", "true", "[1,2]"] {
            let value = decode_value(raw);
            assert_eq!(encode_value(&value), raw);
        }
    }

    #[test]
    fn test_bare_words_decode_as_strings() {
        assert_eq!(decode_value("unquoted"), Value::String("unquoted".into()));
    }
}
