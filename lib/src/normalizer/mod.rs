// lib/src/normalizer/mod.rs

//! Turns whatever the backend sent into canonical records.
//!
//! Every entity is described by an [`EntityTable`]: where to look for it on
//! the aggregate resident record, which field orders a list of them by
//! recency, and for each canonical field an ordered list of sources with a
//! fallback. The resolution algorithm below is written once and driven
//! entirely by those tables, so every entity gets the same guarantees:
//! normalization never fails, unknown shapes resolve to defaulted records,
//! and list payloads resolve to lists whatever envelope they arrived in.

pub mod tables;
pub mod transforms;

use chrono::NaiveDateTime;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use models::{ResidentId, ShapeError, TransportError};

use crate::backend::CareBackend;

pub type Transform = fn(&Value) -> Option<Value>;
pub type Derivation = fn(&Map<String, Value>) -> Option<Value>;

/// Keys that wrap a payload without being part of it.
pub const ENVELOPE_KEYS: &[&str] = &["data", "records", "list", "items", "rows", "content"];
/// Keys that may sit beside an envelope key.
pub const META_KEYS: &[&str] = &["code", "msg", "message", "success", "status", "total", "page", "size", "timestamp"];
/// Meta keys that only ever appear on a response envelope.
const RESPONSE_MARKERS: &[&str] = &["code", "success"];

pub enum Source {
    /// A raw field read through a transform.
    Field(&'static str, Transform),
    /// A value synthesized from the whole raw record.
    Derived(Derivation),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Fallback {
    Zero,
    ZeroFloat,
    Empty,
    False,
    Null,
    Tag(&'static str),
}

impl Fallback {
    pub fn value(self) -> Value {
        match self {
            Fallback::Zero => Value::from(0),
            Fallback::ZeroFloat => Value::from(0.0),
            Fallback::Empty => Value::String(String::new()),
            Fallback::False => Value::Bool(false),
            Fallback::Null => Value::Null,
            Fallback::Tag(tag) => Value::String(tag.to_string()),
        }
    }
}

pub struct FieldRule {
    pub canonical: &'static str,
    pub sources: &'static [Source],
    pub fallback: Fallback,
}

impl FieldRule {
    /// Raw keys that mean this field but are not its canonical name.
    pub fn aliases(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.sources.iter().filter_map(move |source| match source {
            Source::Field(key, _) if *key != self.canonical => Some(*key),
            _ => None,
        })
    }
}

pub struct EntityTable {
    pub entity: &'static str,
    /// Keys probed, in order, on the aggregate resident record.
    pub candidate_keys: &'static [&'static str],
    /// Keys probed, in order, to date one record of a list.
    pub recency_keys: &'static [&'static str],
    /// Dedicated endpoint used when the aggregate record has nothing.
    pub history: Option<fn(ResidentId) -> String>,
    pub fields: &'static [FieldRule],
}

/// A canonical record type and the table that produces it.
pub trait Canonical: DeserializeOwned + Default {
    fn table() -> &'static EntityTable;
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Array(items) => !items.is_empty(),
        _ => true,
    }
}

/// Strips response envelopes. Descends only while the object consists of
/// envelope and meta keys, so a record that happens to carry `status` or
/// `data` is left alone.
pub fn unwrap_envelope(payload: &Value) -> &Value {
    let mut current = payload;
    while let Value::Object(map) = current {
        let only_wrapping = !map.is_empty()
            && map.keys().all(|k| ENVELOPE_KEYS.contains(&k.as_str()) || META_KEYS.contains(&k.as_str()));
        let inner = ENVELOPE_KEYS.iter().find_map(|k| map.get(*k));
        match inner {
            Some(inner) if only_wrapping => current = inner,
            _ => break,
        }
    }
    current
}

/// The first candidate key present on `record`, unwrapped.
pub fn probe<'a>(record: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    let record = unwrap_envelope(record);
    keys.iter()
        .find_map(|key| record.get(*key).filter(|v| is_present(v)))
        .map(unwrap_envelope)
}

/// Every object of a list payload. A bare object counts as a one-element
/// list, anything else as an empty one.
pub fn records(payload: &Value) -> Vec<&Map<String, Value>> {
    match unwrap_envelope(payload) {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| {
                let item = item.as_object();
                if item.is_none() {
                    debug!("Skipping non-object list element");
                }
                item
            })
            .collect(),
        Value::Object(map) if is_empty_response(map) => Vec::new(),
        Value::Object(map) => vec![map],
        _ => Vec::new(),
    }
}

// `{"code": 200, "msg": "ok"}` with no payload. Meta keys alone are not
// enough, a reminder can be just `message` and `status`.
fn is_empty_response(map: &Map<String, Value>) -> bool {
    map.keys().any(|k| RESPONSE_MARKERS.contains(&k.as_str()))
        && map.keys().all(|k| META_KEYS.contains(&k.as_str()))
}

fn recency_key(record: &Map<String, Value>, table: &EntityTable) -> (Option<NaiveDateTime>, String) {
    let raw = table
        .recency_keys
        .iter()
        .find_map(|k| record.get(*k).filter(|v| !v.is_null()));
    // Unparseable stamps still order among themselves by their text.
    match raw.map(|v| (v, transforms::parse_timestamp(v))) {
        Some((_, Some(ts))) => (Some(ts), String::new()),
        Some((value, None)) => (None, value.as_str().map(str::to_string).unwrap_or_else(|| value.to_string())),
        None => (None, String::new()),
    }
}

/// Stable descending sort by recency. Undated records sink to the end, ties
/// keep their backend order.
pub fn sort_newest_first(items: &mut [&Map<String, Value>], table: &EntityTable) {
    items.sort_by(|a, b| recency_key(b, table).cmp(&recency_key(a, table)));
}

/// The most recent record of `payload`.
pub fn latest<'a>(payload: &'a Value, table: &EntityTable) -> Option<&'a Map<String, Value>> {
    let mut items = records(payload);
    sort_newest_first(&mut items, table);
    items.into_iter().next()
}

/// Resolves every canonical field of `table` against `raw`.
pub fn materialize(raw: &Map<String, Value>, table: &EntityTable) -> Map<String, Value> {
    table
        .fields
        .iter()
        .map(|rule| {
            let value = rule
                .sources
                .iter()
                .find_map(|source| match source {
                    Source::Field(key, transform) => raw.get(*key).filter(|v| !v.is_null()).and_then(transform),
                    Source::Derived(derive) => derive(raw),
                })
                .unwrap_or_else(|| rule.fallback.value());
            (rule.canonical.to_string(), value)
        })
        .collect()
}

/// Fails when `raw` carries none of the fields `table` knows about.
pub fn check_shape(raw: &Value, table: &EntityTable) -> Result<(), ShapeError> {
    match raw.as_object() {
        Some(map) => check_record_shape(map, table),
        None => Err(ShapeError {
            entity: table.entity,
            message: format!("expected an object, got {}", kind_of(raw)),
        }),
    }
}

fn check_record_shape(map: &Map<String, Value>, table: &EntityTable) -> Result<(), ShapeError> {
    let known = table.fields.iter().any(|rule| {
        rule.sources.iter().any(|source| match source {
            Source::Field(key, _) => map.get(*key).is_some_and(|v| !v.is_null()),
            Source::Derived(derive) => derive(map).is_some(),
        })
    });
    if known {
        Ok(())
    } else {
        Err(ShapeError {
            entity: table.entity,
            message: "no known field present".to_string(),
        })
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Normalizes one raw record. Never fails: shape mismatches are logged and
/// resolve to the defaulted record.
pub fn normalize_record<T: Canonical>(raw: &Map<String, Value>) -> T {
    let table = T::table();
    match serde_json::from_value(Value::Object(materialize(raw, table))) {
        Ok(record) => record,
        Err(e) => {
            let error = ShapeError {
                entity: table.entity,
                message: e.to_string(),
            };
            warn!("{}", error);
            T::default()
        }
    }
}

/// Normalizes a single-record payload. Lists resolve to their newest entry.
pub fn normalize<T: Canonical>(payload: &Value) -> T {
    let table = T::table();
    let unwrapped = unwrap_envelope(payload);
    let raw = match unwrapped {
        Value::Array(_) => latest(unwrapped, table),
        Value::Object(map) => Some(map),
        _ => None,
    };
    let checked = match raw {
        Some(map) => check_record_shape(map, table),
        None => check_shape(unwrapped, table),
    };
    if let Err(e) = checked {
        warn!("{}", e);
    }
    raw.map(normalize_record::<T>).unwrap_or_default()
}

/// Normalizes a list payload, newest first.
pub fn normalize_list<T: Canonical>(payload: &Value) -> Vec<T> {
    normalize_entries(payload).into_iter().map(|(record, _)| record).collect()
}

/// Like [`normalize_list`], keeping each raw record next to its canonical
/// form.
pub fn normalize_entries<T: Canonical>(payload: &Value) -> Vec<(T, Map<String, Value>)> {
    let table = T::table();
    let mut items = records(payload);
    if items.is_empty() && !payload.is_null() && !unwrap_envelope(payload).is_array() {
        debug!("{} list payload resolved to an empty list", table.entity);
    }
    sort_newest_first(&mut items, table);
    items
        .into_iter()
        .map(|raw| (normalize_record(raw), raw.clone()))
        .collect()
}

/// Latest record of `T` for a resident.
///
/// Probes the aggregate record first. When nothing resolves there the
/// entity's history endpoint is asked and its first element taken, the
/// backend sorts history newest first.
pub async fn resolve_latest<T: Canonical>(
    backend: &dyn CareBackend,
    resident_id: ResidentId,
    aggregate: &Value,
) -> Result<Option<T>, TransportError> {
    let table = T::table();
    if let Some(found) = probe(aggregate, table.candidate_keys).and_then(|v| latest(v, table)) {
        return Ok(Some(normalize_record(found)));
    }
    let Some(history) = table.history else {
        return Ok(None);
    };
    let path = history(resident_id);
    debug!("No {} on the resident record, falling back to {}", table.entity, path);
    let body = backend.get(&path).await?;
    Ok(records(&body).first().map(|raw| normalize_record(raw)))
}

/// Every record of `T` for a resident, newest first. Uses the aggregate
/// record when it carries the list, otherwise the entity's endpoint.
pub async fn resolve_list<T: Canonical>(
    backend: &dyn CareBackend,
    resident_id: ResidentId,
    aggregate: &Value,
) -> Result<Vec<T>, TransportError> {
    let table = T::table();
    if let Some(found) = probe(aggregate, table.candidate_keys) {
        return Ok(normalize_list(found));
    }
    match table.history {
        Some(history) => Ok(normalize_list(&backend.get(&history(resident_id)).await?)),
        None => Ok(Vec::new()),
    }
}
