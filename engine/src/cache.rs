//! Cache merging for collection slices.
//!
//! Server payloads are folded into the keyed cache of a collection slice.
//! The cache holds exactly one entry per distinct key value. A missing key
//! counts as `null`, and records without a key match each other the way
//! `undefined == undefined` holds in loose equality.

use crate::{
    error::Result,
    record::{coerce_number, ModelInstance, Record},
    schema::{ModelDescriptor, Verb},
    tracker::Tracker,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// In-flight request flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestFlags {
    pub getting: bool,
    pub posting: bool,
    pub putting: bool,
    pub deleting: bool,
}

impl RestFlags {
    /// Set the flag belonging to `verb`. Index fetches use `getting`.
    pub fn set(&mut self, verb: Verb, value: bool) {
        match verb {
            Verb::Get | Verb::Index => self.getting = value,
            Verb::Post => self.posting = value,
            Verb::Put => self.putting = value,
            Verb::Delete => self.deleting = value,
        }
    }

    pub fn clear(&mut self) {
        *self = RestFlags::default();
    }

    /// Whether any request is in flight.
    pub fn any(&self) -> bool {
        self.getting || self.posting || self.putting || self.deleting
    }
}

/// One cached record with its flags and tracker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    #[serde(flatten)]
    pub flags: RestFlags,
    #[serde(flatten)]
    pub tracker: Tracker,
    #[serde(default)]
    pub record: Record,
}

impl CacheEntry {
    /// A fresh entry: default flags and tracker.
    pub fn new(record: Record) -> Self {
        Self {
            record,
            ..Self::default()
        }
    }

    /// The entry's value for `key`, `null` when absent.
    pub fn key_value(&self, key: &str) -> &Value {
        self.record.get(key).unwrap_or(&Value::Null)
    }

    /// Whether this entry holds the record identified by `value`.
    pub fn matches(&self, key: &str, value: &Value) -> bool {
        keys_match(self.key_value(key), value)
    }
}

/// Loose key equality: `1` matches `"1"`, `null` matches only `null`.
pub fn keys_match(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Number(_), Value::String(_))
        | (Value::String(_), Value::Number(_))
        | (Value::Bool(_), _)
        | (_, Value::Bool(_)) => coerce_number(a) == coerce_number(b),
        _ => false,
    }
}

/// Wrap raw records into fresh cache entries through the record codec.
pub fn wrap_records(incoming: &[Value], descriptor: &Arc<ModelDescriptor>) -> Result<Vec<CacheEntry>> {
    incoming
        .iter()
        .map(|raw| {
            let instance = ModelInstance::construct(Arc::clone(descriptor), raw)?;
            Ok(CacheEntry::new(instance.to_store_record()))
        })
        .collect()
}

/// Merge incoming records into `cache`, keyed by `key`.
///
/// Existing entries matching an incoming record are replaced in place;
/// incoming records that matched nothing are appended in order. Within one
/// batch, the last record for a key wins.
pub fn merge_records_into_cache(
    cache: &[CacheEntry],
    incoming: &[Value],
    key: &str,
    descriptor: &Arc<ModelDescriptor>,
) -> Result<Vec<CacheEntry>> {
    let mut batch: Vec<CacheEntry> = Vec::with_capacity(incoming.len());
    for entry in wrap_records(incoming, descriptor)? {
        let duplicate = batch
            .iter()
            .position(|seen| seen.matches(key, entry.key_value(key)));
        match duplicate {
            Some(pos) => batch[pos] = entry,
            None => batch.push(entry),
        }
    }

    let mut consumed = vec![false; batch.len()];
    let mut merged = Vec::with_capacity(cache.len() + batch.len());

    for existing in cache {
        let replacement = batch
            .iter()
            .position(|fresh| fresh.matches(key, existing.key_value(key)));
        match replacement {
            // A second cached entry for an already merged key is dropped.
            Some(i) if consumed[i] => {}
            Some(i) => {
                merged.push(batch[i].clone());
                consumed[i] = true;
            }
            None => merged.push(existing.clone()),
        }
    }

    merged.extend(
        batch
            .into_iter()
            .zip(consumed)
            .filter(|(_, used)| !used)
            .map(|(entry, _)| entry),
    );

    Ok(merged)
}
