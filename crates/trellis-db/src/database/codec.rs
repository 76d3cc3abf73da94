//! Codec pipeline: encode, decode, and cast between in-memory documents and
//! backend rows. Filter chains run forward on encode and reversed on
//! decode; casting covers adapters that do not coerce stored values to
//! their declared types.

use super::Database;
use crate::filter::FILTER_DATETIME;
use crate::metadata::collection_attributes;
use trellis_common::types::{FIELD_COLLECTION, FIELD_CREATED_AT, FIELD_ID, FIELD_UPDATED_AT};
use trellis_common::{Attribute, AttributeType, Document, Result, Value};
use trellis_storage::Adapter;

/// The internal attributes every document carries through the codec.
pub(crate) fn internal_attributes() -> Vec<Attribute> {
    vec![
        Attribute::new(FIELD_ID, AttributeType::String, 255),
        Attribute::new(FIELD_COLLECTION, AttributeType::String, 255),
        Attribute::new(FIELD_CREATED_AT, AttributeType::Datetime, 0)
            .filters(vec![FILTER_DATETIME]),
        Attribute::new(FIELD_UPDATED_AT, AttributeType::Datetime, 0)
            .filters(vec![FILTER_DATETIME]),
    ]
}

fn codec_attributes(collection: &Document) -> Result<Vec<Attribute>> {
    let mut attributes = collection_attributes(collection)?;
    attributes.extend(internal_attributes());
    Ok(attributes)
}

impl<A: Adapter> Database<A> {
    /// Encode a document for the adapter: substitute defaults, then run each
    /// attribute's filter chain in forward order, element-wise.
    pub(crate) fn encode(&self, collection: &Document, document: Document) -> Result<Document> {
        self.run_codec(collection, document, Direction::Encode)
    }

    /// Decode an adapter row back into a caller document with the reversed
    /// filter chains. When `selections` is non-empty, only the named keys
    /// are written back (every attribute is still decoded first: a filter
    /// may have side effects later filters depend on).
    pub(crate) fn decode(
        &self,
        collection: &Document,
        document: Document,
        selections: &[String],
    ) -> Result<Document> {
        let decoded = self.run_codec(collection, document, Direction::Decode)?;
        if selections.is_empty() {
            return Ok(decoded);
        }

        let mut selected = Document::new();
        for (key, value) in decoded.into_map() {
            if selections.iter().any(|s| s == &key) {
                selected.set(key, value);
            }
        }
        Ok(selected)
    }

    fn run_codec(
        &self,
        collection: &Document,
        mut document: Document,
        direction: Direction,
    ) -> Result<Document> {
        let context = document.clone();

        for attribute in codec_attributes(collection)? {
            if attribute.kind == AttributeType::Relationship {
                continue;
            }

            let mut value = document.attribute(&attribute.id);
            if direction == Direction::Encode && value.is_null() && !attribute.default.is_null() {
                value = attribute.default.clone();
            }

            let mut elements = match (attribute.array, value) {
                (true, Value::Array(elements)) => elements,
                (true, Value::Null) => {
                    document.set(attribute.id.as_str(), Value::Null);
                    continue;
                }
                (true, other) => vec![other],
                (false, other) => vec![other],
            };

            for element in &mut elements {
                if element.is_null() {
                    continue;
                }
                let mut current = std::mem::take(element);
                match direction {
                    Direction::Encode => {
                        for name in &attribute.filters {
                            current = self.resolve_filter(name)?.encode(current, &context)?;
                        }
                    }
                    Direction::Decode => {
                        for name in attribute.filters.iter().rev() {
                            current = self.resolve_filter(name)?.decode(current, &context)?;
                        }
                    }
                }
                *element = current;
            }

            let value = if attribute.array {
                Value::Array(elements)
            } else {
                elements.pop().unwrap_or(Value::Null)
            };
            document.set(attribute.id.as_str(), value);
        }

        Ok(document)
    }

    /// Coerce stored values to their declared primitive types, for adapters
    /// that do not cast for themselves. String-encoded arrays are
    /// JSON-parsed first.
    pub(crate) fn cast(&self, collection: &Document, mut document: Document) -> Result<Document> {
        for attribute in collection_attributes(collection)? {
            if attribute.kind == AttributeType::Relationship {
                continue;
            }
            let value = document.attribute(&attribute.id);
            if value.is_null() {
                continue;
            }

            if attribute.array {
                let elements = match value {
                    Value::String(s) => match serde_json::from_str::<serde_json::Value>(&s) {
                        Ok(serde_json::Value::Array(items)) => {
                            items.into_iter().map(Value::from_json).collect()
                        }
                        _ => continue,
                    },
                    Value::Array(elements) => elements,
                    _ => continue,
                };
                let cast: Vec<Value> = elements
                    .into_iter()
                    .map(|e| cast_value(e, attribute.kind))
                    .collect();
                document.set(attribute.id.as_str(), Value::Array(cast));
            } else {
                document.set(attribute.id.as_str(), cast_value(value, attribute.kind));
            }
        }
        Ok(document)
    }
}

#[derive(PartialEq, Clone, Copy)]
enum Direction {
    Encode,
    Decode,
}

fn cast_value(value: Value, kind: AttributeType) -> Value {
    if value.is_null() {
        return value;
    }
    match kind {
        AttributeType::Boolean => match &value {
            Value::Bool(_) => value,
            Value::Int(n) => Value::Bool(*n != 0),
            Value::String(s) => match s.as_str() {
                "true" | "1" => Value::Bool(true),
                "false" | "0" => Value::Bool(false),
                _ => value,
            },
            _ => value,
        },
        AttributeType::Integer => match &value {
            Value::Int(_) => value,
            Value::Float(f) => Value::Int(*f as i64),
            Value::String(s) => s.parse::<i64>().map(Value::Int).unwrap_or(value),
            _ => value,
        },
        AttributeType::Double => match &value {
            Value::Float(_) => value,
            Value::Int(n) => Value::Float(*n as f64),
            Value::String(s) => s.parse::<f64>().map(Value::Float).unwrap_or(value),
            _ => value,
        },
        _ => value,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{FnFilter, FILTER_JSON};
    use std::sync::Arc;
    use trellis_common::types::FIELD_PERMISSIONS;
    use trellis_common::METADATA;
    use trellis_storage::{MemoryAdapter, MemoryCache};

    fn database() -> Database<MemoryAdapter> {
        Database::new(MemoryAdapter::new(), Arc::new(MemoryCache::new()))
    }

    fn collection_with(attributes: Vec<Attribute>) -> Document {
        let mut collection = Document::new();
        collection.set(FIELD_ID, "books");
        collection.set(FIELD_COLLECTION, METADATA);
        collection.set("name", "books");
        collection.set(
            "attributes",
            Value::Array(attributes.iter().map(Attribute::to_value).collect()),
        );
        collection.set("indexes", Value::Array(Vec::new()));
        collection
    }

    #[test]
    fn test_encode_applies_default() {
        let db = database();
        let collection = collection_with(vec![
            Attribute::new("status", AttributeType::String, 16).default_value("draft"),
        ]);

        let mut doc = Document::new();
        doc.set(FIELD_ID, "b1");
        let encoded = db.encode(&collection, doc).unwrap();
        assert_eq!(encoded.attribute("status"), Value::String("draft".into()));
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let db = database();
        let collection = collection_with(vec![
            Attribute::new("title", AttributeType::String, 64),
            Attribute::new("meta", AttributeType::String, 1024).filters(vec![FILTER_JSON]),
        ]);

        let mut meta = Document::new();
        meta.set("pages", 120i64);

        let mut doc = Document::new();
        doc.set(FIELD_ID, "b1");
        doc.set("title", "X");
        doc.set("meta", meta.to_value());

        let encoded = db.encode(&collection, doc.clone()).unwrap();
        assert!(matches!(encoded.attribute("meta"), Value::String(_)));

        let decoded = db.decode(&collection, encoded, &[]).unwrap();
        assert_eq!(decoded.attribute("title"), doc.attribute("title"));
        assert_eq!(decoded.attribute("meta"), doc.attribute("meta"));
    }

    #[test]
    fn test_filter_chain_reversed_on_decode() {
        use parking_lot::Mutex;

        let order: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

        let db = database();
        for (name, label) in [("first", "f1"), ("second", "f2"), ("third", "f3")] {
            let enc = order.clone();
            let dec = order.clone();
            let enc_label: &'static str = label;
            let dec_label: &'static str = label;
            db.add_filter(
                name,
                Arc::new(FnFilter::new(
                    move |v, _| {
                        enc.lock().push(enc_label);
                        Ok(v)
                    },
                    move |v, _| {
                        dec.lock().push(dec_label);
                        Ok(v)
                    },
                )),
            );
        }

        let collection = collection_with(vec![Attribute::new("x", AttributeType::String, 8)
            .filters(vec!["first", "second", "third"])]);

        let mut doc = Document::new();
        doc.set("x", "v");

        let encoded = db.encode(&collection, doc).unwrap();
        assert_eq!(*order.lock(), vec!["f1", "f2", "f3"]);

        order.lock().clear();
        db.decode(&collection, encoded, &[]).unwrap();
        assert_eq!(*order.lock(), vec!["f3", "f2", "f1"]);
    }

    #[test]
    fn test_array_elements_filtered_individually() {
        let db = database();
        let collection = collection_with(vec![Attribute::new("meta", AttributeType::String, 512)
            .array()
            .filters(vec![FILTER_JSON])]);

        let mut doc = Document::new();
        doc.set(
            "meta",
            Value::Array(vec![
                Value::Array(vec![Value::Int(1)]),
                Value::Null,
                Value::Array(vec![Value::Int(2)]),
            ]),
        );

        let encoded = db.encode(&collection, doc).unwrap();
        let Value::Array(elements) = encoded.attribute("meta") else {
            panic!("array preserved");
        };
        assert!(matches!(&elements[0], Value::String(_)));
        assert!(elements[1].is_null());
        assert!(matches!(&elements[2], Value::String(_)));
    }

    #[test]
    fn test_decode_respects_selections() {
        let db = database();
        let collection = collection_with(vec![
            Attribute::new("title", AttributeType::String, 64),
            Attribute::new("year", AttributeType::Integer, 8),
        ]);

        let mut doc = Document::new();
        doc.set(FIELD_ID, "b1");
        doc.set(FIELD_PERMISSIONS, Value::Array(Vec::new()));
        doc.set("title", "X");
        doc.set("year", 1999i64);

        let selections = vec!["title".to_string(), FIELD_ID.to_string()];
        let decoded = db.decode(&collection, doc, &selections).unwrap();
        assert_eq!(decoded.attribute("title"), Value::String("X".into()));
        assert_eq!(decoded.id(), "b1");
        assert!(decoded.get_attribute("year").is_none());
        assert!(decoded.get_attribute(FIELD_PERMISSIONS).is_none());
    }

    #[test]
    fn test_cast_coerces_primitives() {
        let db = database();
        let collection = collection_with(vec![
            Attribute::new("year", AttributeType::Integer, 8),
            Attribute::new("rating", AttributeType::Double, 8),
            Attribute::new("active", AttributeType::Boolean, 1),
            Attribute::new("scores", AttributeType::Integer, 8).array(),
        ]);

        let mut doc = Document::new();
        doc.set("year", "1999");
        doc.set("rating", 4i64);
        doc.set("active", "true");
        doc.set("scores", "[1, 2, 3]");

        let cast = db.cast(&collection, doc).unwrap();
        assert_eq!(cast.attribute("year"), Value::Int(1999));
        assert_eq!(cast.attribute("rating"), Value::Float(4.0));
        assert_eq!(cast.attribute("active"), Value::Bool(true));
        assert_eq!(
            cast.attribute("scores"),
            Value::Array(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
        );
    }

    #[test]
    fn test_missing_filter_is_fatal() {
        let db = database();
        let collection = collection_with(vec![
            Attribute::new("x", AttributeType::String, 8).filters(vec!["no-such-filter"]),
        ]);

        let mut doc = Document::new();
        doc.set("x", "v");
        let err = db.encode(&collection, doc).unwrap_err();
        assert_eq!(err.code(), "filter_not_found");
    }
}
