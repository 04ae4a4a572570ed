//! Query strings for resolved routes.
//!
//! Route queries arrive either as a JSON object or as a raw query string.
//! Both are normalized into a [`Map`] before interpolation; whatever the
//! route template does not consume is serialized back as `?key=value&...`.

use crate::{error::Result, Error};
use serde_json::{Map, Value};

/// Characters `encodeURIComponent` leaves untouched besides ASCII alphanumerics.
const UNRESERVED_MARKS: &[u8] = b"-_.!~*'()";

/// Percent-encode a string with `encodeURIComponent` rules.
pub fn encode_component(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        if byte.is_ascii_alphanumeric() || UNRESERVED_MARKS.contains(&byte) {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

/// Percent-decode a string. Returns `None` when an escape is malformed or
/// the decoded bytes are not UTF-8.
pub fn decode_component(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes.get(i + 1..i + 3)?;
            if !hex.iter().all(u8::is_ascii_hexdigit) {
                return None;
            }
            let hex = std::str::from_utf8(hex).ok()?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }

    String::from_utf8(out).ok()
}

/// The string form of a JSON value inside a URL.
///
/// Strings are used verbatim; every other value uses its JSON text, so
/// `23` becomes `"23"` and `null` becomes `"null"`.
pub fn param_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Parse a query string (`?a=1&b=two`) into a map.
///
/// Values are percent-decoded, keys are kept verbatim. A pair without `=`
/// maps to an empty string. A value that fails to decode is kept raw.
pub fn query_string_to_map(query: &str) -> Map<String, Value> {
    let query = query.strip_prefix('?').unwrap_or(query);
    let mut map = Map::new();

    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (key, raw) = pair.split_once('=').unwrap_or((pair, ""));
        let value = decode_component(raw).unwrap_or_else(|| raw.to_string());
        map.insert(key.to_string(), Value::String(value));
    }

    map
}

/// Serialize a map as a query string, including the leading `?`.
///
/// An empty map yields an empty string.
pub fn map_to_query_string(map: &Map<String, Value>) -> String {
    let mut out = String::new();
    for (key, value) in map {
        out.push(if out.is_empty() { '?' } else { '&' });
        out.push_str(&encode_component(key));
        out.push('=');
        out.push_str(&encode_component(&param_string(value)));
    }
    out
}

/// Normalize a route query argument.
///
/// Accepts nothing, `null`, an object or a query string. Arrays and other
/// scalars are rejected.
pub fn normalize_query(query: Option<&Value>) -> Result<Map<String, Value>> {
    match query {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(Value::String(s)) => Ok(query_string_to_map(s)),
        Some(_) => Err(Error::RouteNotFound(
            "route query can only be a string or an object".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn encode_matches_uri_component_rules() {
        assert_eq!(encode_component("abc-_.!~*'()"), "abc-_.!~*'()");
        assert_eq!(encode_component("a b&c=d"), "a%20b%26c%3Dd");
        assert_eq!(encode_component("é"), "%C3%A9");
        assert_eq!(encode_component("/path?"), "%2Fpath%3F");
    }

    #[test]
    fn decode_escapes() {
        assert_eq!(decode_component("a%20b").as_deref(), Some("a b"));
        assert_eq!(decode_component("%C3%A9").as_deref(), Some("é"));
        assert_eq!(decode_component("plain").as_deref(), Some("plain"));
        assert_eq!(decode_component("%zz"), None);
        assert_eq!(decode_component("%2"), None);
    }

    #[test]
    fn decode_rejects_signed_escapes() {
        assert_eq!(decode_component("%+F"), None);
        assert_eq!(decode_component("%-1"), None);
        assert_eq!(decode_component("%0f").as_deref(), Some("\u{f}"));
    }

    #[test]
    fn parse_query_string() {
        let map = query_string_to_map("?page=2&name=Jim%20Bob&empty=");
        assert_eq!(
            Value::Object(map),
            json!({"page": "2", "name": "Jim Bob", "empty": ""})
        );
    }

    #[test]
    fn parse_keeps_keys_raw() {
        let map = query_string_to_map("a%20b=c%20d");
        assert_eq!(map.get("a%20b"), Some(&json!("c d")));
    }

    #[test]
    fn serialize_query_string() {
        let map = json!({"page": 2, "q": "a b"});
        assert_eq!(
            map_to_query_string(map.as_object().unwrap()),
            "?page=2&q=a%20b"
        );
        assert_eq!(map_to_query_string(&Map::new()), "");
    }

    #[test]
    fn normalize_rejects_arrays() {
        assert!(normalize_query(Some(&json!(["a"]))).is_err());
        assert!(normalize_query(Some(&json!(3))).is_err());
        assert!(normalize_query(None).unwrap().is_empty());
        assert!(normalize_query(Some(&Value::Null)).unwrap().is_empty());
        assert_eq!(
            normalize_query(Some(&json!("a=1"))).unwrap().get("a"),
            Some(&json!("1"))
        );
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_query_string_round_trip(
                pairs in proptest::collection::vec(("[a-zA-Z0-9_]{1,8}", "\\PC{0,12}"), 0..6)
            ) {
                let mut original = Map::new();
                for (key, value) in pairs {
                    original.insert(key, Value::String(value));
                }

                let encoded = map_to_query_string(&original);
                let parsed = query_string_to_map(&encoded);
                prop_assert_eq!(&parsed, &original);

                let again = query_string_to_map(&map_to_query_string(&parsed));
                prop_assert_eq!(again, parsed);
            }
        }
    }
}
