//! Version and request tracking.
//!
//! Every record instance, singleton slice and cache entry carries a
//! [`Tracker`]: a local write counter, the outcome of the last failed
//! request, and the errors the server reported for it. A failed request
//! whose `_request.version` is behind the current `_version` describes a
//! record the user has since edited, so the failure can be treated as stale.

use crate::Version;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Outcome of the last failed request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestInfo {
    /// `_version` of the record when the request was sent
    #[serde(default, deserialize_with = "null_as_zero")]
    pub version: Version,
    /// HTTP status
    #[serde(default)]
    pub status: Option<u16>,
    /// Server-supplied body
    #[serde(default)]
    pub body: Option<Value>,
}

impl RequestInfo {
    /// Create request info for a failed response.
    pub fn new(version: Version, status: u16, body: Value) -> Self {
        Self {
            version,
            status: Some(status),
            body: Some(body),
        }
    }

    /// Reset in place: `version` stays present as 0, everything else nulls.
    pub fn clear(&mut self) {
        self.version = 0;
        self.status = None;
        self.body = None;
    }

    /// Whether the request was sent for an older version than `current`.
    pub fn is_stale(&self, current: Version) -> bool {
        self.status.is_some() && self.version < current
    }
}

fn null_as_zero<'de, D>(deserializer: D) -> Result<Version, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Version>::deserialize(deserializer)?.unwrap_or(0))
}

/// Field (or global) errors reported by the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Errors(pub Map<String, Value>);

impl Errors {
    /// Remove every key.
    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Errors from a JSON value. Anything but an object yields no errors.
    pub fn from_value(value: Option<&Value>) -> Self {
        match value {
            Some(Value::Object(map)) => Errors(map.clone()),
            _ => Errors::default(),
        }
    }
}

/// Version counter plus request/error bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tracker {
    /// Local write counter
    #[serde(rename = "_version", default, deserialize_with = "null_as_zero")]
    pub version: Version,
    /// Last failed request
    #[serde(rename = "_request", default)]
    pub request: RequestInfo,
    /// Server-reported errors
    #[serde(default)]
    pub errors: Errors,
}

impl Tracker {
    /// Count one local write.
    pub fn bump(&mut self) {
        self.version += 1;
    }

    /// A save went through: the record is clean again.
    pub fn confirm_save(&mut self) {
        self.version = 0;
        self.request.clear();
        self.errors.clear();
    }

    /// Record a failed request. Existing state is cleared before copying so
    /// no key from an earlier failure survives.
    pub fn record_failure(&mut self, request: RequestInfo, errors: Errors) {
        self.request = request;
        self.errors.clear();
        self.errors.0.extend(errors.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_clear_keeps_version_key() {
        let mut request = RequestInfo::new(3, 422, json!("Not saved"));
        request.clear();
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"version": 0, "status": null, "body": null})
        );
    }

    #[test]
    fn request_accepts_null_version() {
        let request: RequestInfo =
            serde_json::from_value(json!({"version": null, "status": null, "body": null}))
                .unwrap();
        assert_eq!(request, RequestInfo::default());
    }

    #[test]
    fn stale_requests() {
        let request = RequestInfo::new(2, 500, json!(""));
        assert!(request.is_stale(3));
        assert!(!request.is_stale(2));
        assert!(!RequestInfo::default().is_stale(5));
    }

    #[test]
    fn tracker_lifecycle() {
        let mut tracker = Tracker::default();
        tracker.bump();
        tracker.bump();
        assert_eq!(tracker.version, 2);

        let errors = Errors::from_value(Some(&json!({"name": "can't be blank"})));
        tracker.record_failure(RequestInfo::new(2, 422, json!("Not saved")), errors);
        assert_eq!(tracker.request.status, Some(422));
        assert_eq!(tracker.errors.get("name"), Some(&json!("can't be blank")));

        tracker.record_failure(RequestInfo::new(2, 500, json!("")), Errors::default());
        assert!(tracker.errors.is_empty());

        tracker.confirm_save();
        assert_eq!(tracker, Tracker::default());
    }

    #[test]
    fn tracker_wire_shape() {
        let tracker: Tracker = serde_json::from_value(json!({
            "_version": 4,
            "_request": {"version": 3, "status": 404, "body": "missing"},
            "errors": {"base": "gone"}
        }))
        .unwrap();

        assert_eq!(tracker.version, 4);
        assert!(tracker.request.is_stale(4));
        assert_eq!(
            serde_json::to_value(Tracker::default()).unwrap(),
            json!({"_version": 0, "_request": {"version": 0, "status": null, "body": null}, "errors": {}})
        );
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_bumps_count_writes(writes in 0usize..200) {
                let mut tracker = Tracker::default();
                for expected in 1..=writes {
                    tracker.bump();
                    prop_assert_eq!(tracker.version, expected as u64);
                }
                tracker.confirm_save();
                prop_assert_eq!(tracker.version, 0);
            }
        }
    }
}
