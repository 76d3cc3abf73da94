//! Trellis Filter - Attribute Filter Registry
//!
//! Filters are named, reversible value transforms applied per attribute by
//! the codec: the chain runs in order on encode and in reverse on decode.
//! A process-wide registry holds the built-ins; each database instance can
//! shadow entries with its own registrations.
//!
//! @version 0.1.0
//! @author Trellis Development Team

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use trellis_common::{datetime, Document, Result, Value};

/// Name of the built-in JSON filter.
pub const FILTER_JSON: &str = "json";
/// Name of the built-in datetime filter.
pub const FILTER_DATETIME: &str = "datetime";

// =============================================================================
// Filter Trait
// =============================================================================

/// A reversible value transform applied to one attribute value at a time.
///
/// The owning document is passed as read-only context; filters must not
/// assume any particular attribute is present on it.
pub trait AttributeFilter: Send + Sync {
    fn encode(&self, value: Value, document: &Document) -> Result<Value>;
    fn decode(&self, value: Value, document: &Document) -> Result<Value>;
}

/// An `AttributeFilter` assembled from two closures.
pub struct FnFilter {
    encode: Box<dyn Fn(Value, &Document) -> Result<Value> + Send + Sync>,
    decode: Box<dyn Fn(Value, &Document) -> Result<Value> + Send + Sync>,
}

impl FnFilter {
    pub fn new(
        encode: impl Fn(Value, &Document) -> Result<Value> + Send + Sync + 'static,
        decode: impl Fn(Value, &Document) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        Self {
            encode: Box::new(encode),
            decode: Box::new(decode),
        }
    }
}

impl AttributeFilter for FnFilter {
    fn encode(&self, value: Value, document: &Document) -> Result<Value> {
        (self.encode)(value, document)
    }

    fn decode(&self, value: Value, document: &Document) -> Result<Value> {
        (self.decode)(value, document)
    }
}

// =============================================================================
// Process-Wide Registry
// =============================================================================

static SHARED_FILTERS: Lazy<RwLock<HashMap<String, Arc<dyn AttributeFilter>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Register a filter process-wide, replacing any prior registration.
pub fn register_filter(name: impl Into<String>, filter: Arc<dyn AttributeFilter>) {
    SHARED_FILTERS.write().insert(name.into(), filter);
}

/// Look up a process-wide filter.
pub fn shared_filter(name: &str) -> Option<Arc<dyn AttributeFilter>> {
    SHARED_FILTERS.read().get(name).cloned()
}

/// Register the built-in `json` and `datetime` filters. Idempotent: existing
/// registrations, including caller overrides, are left untouched.
pub fn ensure_builtin_filters() {
    let mut filters = SHARED_FILTERS.write();
    filters
        .entry(FILTER_JSON.to_string())
        .or_insert_with(|| Arc::new(JsonFilter));
    filters
        .entry(FILTER_DATETIME.to_string())
        .or_insert_with(|| Arc::new(DatetimeFilter));
}

// =============================================================================
// JSON Filter
// =============================================================================

/// Serializes structured values to a canonical JSON string and back.
pub struct JsonFilter;

impl AttributeFilter for JsonFilter {
    fn encode(&self, value: Value, _document: &Document) -> Result<Value> {
        match &value {
            Value::Object(_) | Value::Array(_) => {
                let json = serde_json::to_string(&value.to_json())
                    .map_err(|e| trellis_common::TrellisError::Serialization(e.to_string()))?;
                Ok(Value::String(json))
            }
            _ => Ok(value),
        }
    }

    fn decode(&self, value: Value, _document: &Document) -> Result<Value> {
        match &value {
            Value::String(s) => match serde_json::from_str::<serde_json::Value>(s) {
                Ok(parsed) => Ok(Value::from_json(parsed)),
                Err(_) => Ok(value),
            },
            _ => Ok(value),
        }
    }
}

// =============================================================================
// Datetime Filter
// =============================================================================

/// Normalizes timestamps to the canonical backend form on encode and the
/// UTC-tagged caller form on decode. Unparseable input passes through
/// unchanged.
pub struct DatetimeFilter;

impl AttributeFilter for DatetimeFilter {
    fn encode(&self, value: Value, _document: &Document) -> Result<Value> {
        match &value {
            Value::String(s) => Ok(datetime::to_db(s)
                .map(Value::String)
                .unwrap_or(value)),
            _ => Ok(value),
        }
    }

    fn decode(&self, value: Value, _document: &Document) -> Result<Value> {
        match &value {
            Value::String(s) => Ok(datetime::to_tz(s)
                .map(Value::String)
                .unwrap_or(value)),
            _ => Ok(value),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_filter_round_trip() {
        let filter = JsonFilter;
        let doc = Document::new();

        let mut nested = Document::new();
        nested.set("$id", "d1");
        nested.set("title", "X");
        let value = nested.to_value();

        let encoded = filter.encode(value.clone(), &doc).unwrap();
        let Value::String(json) = &encoded else {
            panic!("expected a JSON string");
        };
        assert!(json.contains("\"$id\""));

        let decoded = filter.decode(encoded, &doc).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn test_json_filter_passes_primitives() {
        let filter = JsonFilter;
        let doc = Document::new();
        assert_eq!(filter.encode(Value::Int(5), &doc).unwrap(), Value::Int(5));
        assert_eq!(filter.encode(Value::Null, &doc).unwrap(), Value::Null);
        // decode of a non-JSON string is left alone
        assert_eq!(
            filter.decode(Value::String("plain".into()), &doc).unwrap(),
            Value::String("plain".into())
        );
    }

    #[test]
    fn test_datetime_filter() {
        let filter = DatetimeFilter;
        let doc = Document::new();

        let encoded = filter
            .encode(Value::String("2023-04-01T10:30:00.000+00:00".into()), &doc)
            .unwrap();
        assert_eq!(encoded, Value::String("2023-04-01 10:30:00.000".into()));

        let decoded = filter.decode(encoded, &doc).unwrap();
        assert_eq!(
            decoded,
            Value::String("2023-04-01T10:30:00.000+00:00".into())
        );
    }

    #[test]
    fn test_datetime_filter_leaves_garbage() {
        let filter = DatetimeFilter;
        let doc = Document::new();
        assert_eq!(
            filter.encode(Value::String("not a date".into()), &doc).unwrap(),
            Value::String("not a date".into())
        );
        assert_eq!(filter.encode(Value::Null, &doc).unwrap(), Value::Null);
    }

    #[test]
    fn test_builtin_registration_is_idempotent() {
        ensure_builtin_filters();
        ensure_builtin_filters();
        assert!(shared_filter(FILTER_JSON).is_some());
        assert!(shared_filter(FILTER_DATETIME).is_some());
    }

    #[test]
    fn test_fn_filter() {
        let filter = FnFilter::new(
            |v, _| Ok(Value::String(format!("enc:{:?}", v))),
            |v, _| Ok(v),
        );
        let doc = Document::new();
        let out = filter.encode(Value::Int(1), &doc).unwrap();
        assert!(matches!(out, Value::String(s) if s.starts_with("enc:")));
    }
}
