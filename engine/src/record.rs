//! Record codec.
//!
//! A [`ModelInstance`] wraps a plain JSON record with the schema rules of
//! its model: kind coercion on read and write, write-once identity and
//! timestamps, an immutable pristine snapshot, and version tracking.

use crate::{
    error::Result,
    schema::{FieldKind, ModelDescriptor, DEFAULT_KEY},
    tracker::{Errors, RequestInfo, Tracker},
    Error,
};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// A plain record: field name to raw JSON value.
pub type Record = Map<String, Value>;

/// Properties that can only be set at construction.
const READ_ONLY: &[&str] = &[DEFAULT_KEY, "createdAt", "updatedAt", "pristineRecord"];

/// JavaScript-style truthiness: `false`, `0`, `NaN`, `""` and `null` are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Whether a value can identify a record: anything but `null`, `false`
/// and the empty string. `0` is a valid identity.
pub fn is_identity(value: &Value) -> bool {
    !matches!(value, Value::Null | Value::Bool(false)) && value.as_str() != Some("")
}

/// Boolean coercion applied on write: the string `"false"` is false,
/// everything else follows truthiness.
pub fn coerce_boolean(value: &Value) -> Value {
    match value {
        Value::String(s) if s == "false" => Value::Bool(false),
        other => Value::Bool(is_truthy(other)),
    }
}

/// Numeric coercion applied on read.
pub fn coerce_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse().unwrap_or(f64::NAN)
            }
        }
        Value::Bool(b) => f64::from(u8::from(*b)),
        _ => f64::NAN,
    }
}

/// Parse a date from an RFC 3339 string, a `YYYY-MM-DD` string or epoch
/// milliseconds.
pub fn parse_date(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
                Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
            }),
        Value::Number(n) => Utc.timestamp_millis_opt(n.as_i64()?).single(),
        _ => None,
    }
}

/// Typed view of a field, coerced by its schema kind.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Number(f64),
    Boolean(bool),
    Date(DateTime<Utc>),
    Object(Map<String, Value>),
    Array(Vec<Value>),
    /// `String` fields and unknown kinds, untouched
    Raw(Value),
}

impl FieldValue {
    fn read(kind: &FieldKind, raw: Option<&Value>) -> Self {
        let raw = raw.unwrap_or(&Value::Null);
        match (kind, raw) {
            (FieldKind::Object, Value::Null) => FieldValue::Object(Map::new()),
            (FieldKind::Array, Value::Null) => FieldValue::Array(Vec::new()),
            (_, Value::Null) => FieldValue::Null,
            (FieldKind::Number, v) => FieldValue::Number(coerce_number(v)),
            (FieldKind::Boolean, v) => FieldValue::Boolean(is_truthy(&coerce_boolean(v))),
            (FieldKind::Date, v) => parse_date(v).map_or(FieldValue::Null, FieldValue::Date),
            (FieldKind::Object, Value::Object(map)) => FieldValue::Object(map.clone()),
            (FieldKind::Array, Value::Array(items)) => FieldValue::Array(items.clone()),
            (_, v) => FieldValue::Raw(v.clone()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null | FieldValue::Raw(Value::Null))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Raw(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<&DateTime<Utc>> {
        match self {
            FieldValue::Date(dt) => Some(dt),
            _ => None,
        }
    }
}

/// Server-managed timestamps, present when the schema declares them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timestamps {
    pub created_at: Value,
    pub updated_at: Value,
}

impl Timestamps {
    fn from_raw(raw: &Record) -> Self {
        let pick = |snake: &str, camel: &str| {
            [snake, camel]
                .iter()
                .filter_map(|k| raw.get(*k))
                .find(|v| is_truthy(v))
                .cloned()
                .unwrap_or(Value::Null)
        };
        Self {
            created_at: pick("created_at", "createdAt"),
            updated_at: pick("updated_at", "updatedAt"),
        }
    }
}

/// A record bound to its model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInstance {
    descriptor: Arc<ModelDescriptor>,
    record: Record,
    pristine: Record,
    timestamps: Option<Timestamps>,
    tracker: Tracker,
}

impl ModelInstance {
    /// Build an instance from raw input.
    ///
    /// `raw` must be an object or `null`. Schema fields absent from the
    /// input are `null`. `id` (or `_id`) becomes the write-once identity,
    /// and `_version`, `_request` and `errors` seed the tracker.
    pub fn construct(descriptor: Arc<ModelDescriptor>, raw: &Value) -> Result<Self> {
        let empty = Map::new();
        let raw = match raw {
            Value::Object(map) => map,
            Value::Null => &empty,
            other => {
                return Err(Error::InvalidPayload(format!(
                    "#<{}> expects an object, got {}",
                    descriptor.name,
                    json_kind(other)
                )))
            }
        };

        let mut record = Record::new();
        let id = ["id", "_id"]
            .iter()
            .filter_map(|k| raw.get(*k))
            .find(|v| is_identity(v));
        if let Some(id) = id {
            record.insert(DEFAULT_KEY.to_string(), id.clone());
        }

        for field in &descriptor.schema.fields {
            if field.name == DEFAULT_KEY {
                continue;
            }
            let mut value = raw.get(&field.name).cloned().unwrap_or(Value::Null);
            if field.kind == FieldKind::Boolean && !value.is_null() {
                value = coerce_boolean(&value);
            }
            record.insert(field.name.clone(), value);
        }

        let timestamps = descriptor
            .schema
            .timestamps
            .then(|| Timestamps::from_raw(raw));

        let tracker = Tracker {
            version: raw.get("_version").and_then(Value::as_u64).unwrap_or(0),
            request: raw
                .get("_request")
                .and_then(|r| serde_json::from_value::<RequestInfo>(r.clone()).ok())
                .unwrap_or_default(),
            errors: Errors::from_value(raw.get("errors")),
        };

        Ok(Self {
            descriptor,
            pristine: record.clone(),
            record,
            timestamps,
            tracker,
        })
    }

    /// Rebuild an instance from a store entry's record and tracker.
    pub fn hydrate(descriptor: Arc<ModelDescriptor>, record: &Record, tracker: &Tracker) -> Result<Self> {
        let mut instance = Self::construct(descriptor, &Value::Object(record.clone()))?;
        instance.tracker = tracker.clone();
        Ok(instance)
    }

    pub fn descriptor(&self) -> &ModelDescriptor {
        &self.descriptor
    }

    /// Shared handle to the descriptor.
    pub fn descriptor_arc(&self) -> Arc<ModelDescriptor> {
        Arc::clone(&self.descriptor)
    }

    /// The model name.
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// The record identity, `null` for unsaved records.
    pub fn id(&self) -> &Value {
        self.record.get(DEFAULT_KEY).unwrap_or(&Value::Null)
    }

    /// Whether the record has an identity.
    pub fn has_id(&self) -> bool {
        is_identity(self.id())
    }

    /// Value of the model's primary key field.
    pub fn key_value(&self) -> &Value {
        self.record
            .get(self.descriptor.key())
            .unwrap_or(&Value::Null)
    }

    /// The current plain record.
    pub fn record(&self) -> &Record {
        &self.record
    }

    /// The record as it was at construction.
    pub fn pristine_record(&self) -> &Record {
        &self.pristine
    }

    /// Read a field through its kind coercion.
    pub fn get(&self, field: &str) -> Result<FieldValue> {
        if field == DEFAULT_KEY {
            return Ok(FieldValue::Raw(self.id().clone()));
        }
        let def = self
            .descriptor
            .schema
            .field(field)
            .ok_or_else(|| self.unknown_field(field))?;
        Ok(FieldValue::read(&def.kind, self.record.get(field)))
    }

    /// Write a field. Each successful write bumps `_version` by one.
    pub fn set(&mut self, field: &str, value: Value) -> Result<()> {
        if READ_ONLY.contains(&field) {
            return Err(Error::ImmutableProperty {
                model: self.descriptor.name.clone(),
                property: field.to_string(),
            });
        }

        let kind = match self.descriptor.schema.field(field) {
            Some(def) => def.kind.clone(),
            None => return Err(self.unknown_field(field)),
        };

        let value = match kind {
            FieldKind::Boolean => coerce_boolean(&value),
            _ => value,
        };

        self.record.insert(field.to_string(), value);
        self.tracker.bump();
        Ok(())
    }

    /// Write attributes in order, stopping at the first failure.
    pub fn assign(&mut self, attributes: &Map<String, Value>) -> Result<()> {
        for (field, value) in attributes {
            self.set(field, value.clone())?;
        }
        Ok(())
    }

    pub fn timestamps(&self) -> Option<&Timestamps> {
        self.timestamps.as_ref()
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.timestamps.as_ref().and_then(|t| parse_date(&t.created_at))
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.timestamps.as_ref().and_then(|t| parse_date(&t.updated_at))
    }

    pub fn version(&self) -> u64 {
        self.tracker.version
    }

    pub fn request(&self) -> &RequestInfo {
        &self.tracker.request
    }

    pub fn errors(&self) -> &Errors {
        &self.tracker.errors
    }

    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    /// The shape cached in the store: the record plus timestamps.
    pub fn to_store_record(&self) -> Record {
        let mut out = self.record.clone();
        if let Some(timestamps) = &self.timestamps {
            out.insert("createdAt".into(), timestamps.created_at.clone());
            out.insert("updatedAt".into(), timestamps.updated_at.clone());
        }
        out
    }

    /// Take over the state of a saved copy of this record.
    pub fn absorb_saved(&mut self, saved: &ModelInstance) {
        for (field, value) in &saved.record {
            self.record.insert(field.clone(), value.clone());
        }
        self.tracker.confirm_save();
        if let (Some(ours), Some(theirs)) = (self.timestamps.as_mut(), saved.timestamps.as_ref()) {
            *ours = theirs.clone();
        }
    }

    /// Record a failed save.
    pub fn record_failure(&mut self, request: RequestInfo, errors: Errors) {
        self.tracker.record_failure(request, errors);
    }

    fn unknown_field(&self, field: &str) -> Error {
        Error::UnknownField {
            model: self.descriptor.name.clone(),
            field: field.to_string(),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
