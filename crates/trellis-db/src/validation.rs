//! Trellis Validation - Document and Index Validators
//!
//! Structure validation for documents against their collection schema, and
//! index validation against the attribute set, in the `is_valid` +
//! `description` shape the engine consumes. Also hosts the process-wide
//! format registry consulted by attribute creation.
//!
//! @version 0.1.0
//! @author Trellis Development Team

use crate::metadata::collection_attributes;
use once_cell::sync::Lazy;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use trellis_common::types::{FIELD_COLLECTION, FIELD_CREATED_AT, FIELD_ID, FIELD_UPDATED_AT};
use trellis_common::{datetime, Attribute, AttributeType, Document, Index, IndexType, Result, Value};

// =============================================================================
// Format Registry
// =============================================================================

/// A named format validator, applicable to one attribute type.
#[derive(Clone)]
pub struct Format {
    pub kind: AttributeType,
    pub validate: Arc<dyn Fn(&Value, &Value) -> bool + Send + Sync>,
}

static FORMATS: Lazy<RwLock<HashMap<String, Format>>> = Lazy::new(|| RwLock::new(HashMap::new()));

/// Register a format validator for an attribute type, replacing any prior
/// registration under the same name.
pub fn add_format(
    name: impl Into<String>,
    kind: AttributeType,
    validate: impl Fn(&Value, &Value) -> bool + Send + Sync + 'static,
) {
    FORMATS.write().insert(
        name.into(),
        Format {
            kind,
            validate: Arc::new(validate),
        },
    );
}

/// Whether a format is registered for the given attribute type.
pub fn has_format(name: &str, kind: AttributeType) -> bool {
    FORMATS
        .read()
        .get(name)
        .map(|f| f.kind == kind)
        .unwrap_or(false)
}

/// Look up a registered format.
pub fn get_format(name: &str) -> Option<Format> {
    FORMATS.read().get(name).cloned()
}

// =============================================================================
// Structure Validator
// =============================================================================

/// Validates an encoded document against its collection schema.
pub struct Structure {
    attributes: Vec<Attribute>,
    description: Mutex<String>,
}

impl Structure {
    /// Build a validator for a collection metadata document.
    pub fn new(collection: &Document) -> Result<Self> {
        Ok(Self {
            attributes: collection_attributes(collection)?,
            description: Mutex::new("Invalid document structure".to_string()),
        })
    }

    /// Validate a document; on failure, `description` names the reason.
    pub fn is_valid(&self, document: &Document) -> bool {
        match self.check(document) {
            Ok(()) => true,
            Err(reason) => {
                *self.description.lock() = reason;
                false
            }
        }
    }

    /// The failure reason of the most recent `is_valid` call.
    pub fn description(&self) -> String {
        self.description.lock().clone()
    }

    fn check(&self, document: &Document) -> std::result::Result<(), String> {
        if document.collection().is_empty() {
            return Err("Missing collection attribute $collection".to_string());
        }

        for key in document.keys() {
            if key.starts_with('$') {
                continue;
            }
            if !self.attributes.iter().any(|a| &a.id == key) {
                return Err(format!("Unknown attribute: '{}'", key));
            }
        }

        for attribute in &self.attributes {
            let value = document.attribute(&attribute.id);

            if value.is_null() {
                if attribute.required {
                    return Err(format!("Missing required attribute '{}'", attribute.id));
                }
                continue;
            }

            if attribute.kind == AttributeType::Relationship {
                continue;
            }

            if attribute.array {
                let Value::Array(elements) = &value else {
                    return Err(format!("Attribute '{}' must be an array", attribute.id));
                };
                for element in elements {
                    if element.is_null() {
                        continue;
                    }
                    Self::check_type(attribute, element)?;
                }
            } else {
                Self::check_type(attribute, &value)?;
            }

            if !attribute.format.is_empty() {
                let format = get_format(&attribute.format)
                    .ok_or_else(|| format!("Unknown format '{}'", attribute.format))?;
                if !(format.validate)(&value, &attribute.format_options) {
                    return Err(format!(
                        "Attribute '{}' does not match format '{}'",
                        attribute.id, attribute.format
                    ));
                }
            }
        }

        Ok(())
    }

    fn check_type(attribute: &Attribute, value: &Value) -> std::result::Result<(), String> {
        match attribute.kind {
            AttributeType::String => match value {
                Value::String(s) => {
                    if attribute.size > 0 && s.chars().count() > attribute.size {
                        Err(format!(
                            "Attribute '{}' must be no longer than {} characters",
                            attribute.id, attribute.size
                        ))
                    } else {
                        Ok(())
                    }
                }
                _ => Err(format!("Attribute '{}' must be a string", attribute.id)),
            },
            AttributeType::Integer => match value {
                Value::Int(_) => Ok(()),
                _ => Err(format!("Attribute '{}' must be an integer", attribute.id)),
            },
            AttributeType::Double => match value {
                Value::Float(_) | Value::Int(_) => Ok(()),
                _ => Err(format!("Attribute '{}' must be a double", attribute.id)),
            },
            AttributeType::Boolean => match value {
                Value::Bool(_) => Ok(()),
                _ => Err(format!("Attribute '{}' must be a boolean", attribute.id)),
            },
            AttributeType::Datetime => match value {
                Value::String(s) if datetime::parse(s).is_some() => Ok(()),
                _ => Err(format!(
                    "Attribute '{}' must be a valid datetime",
                    attribute.id
                )),
            },
            AttributeType::Relationship => Ok(()),
        }
    }
}

// =============================================================================
// Index Validator
// =============================================================================

/// Internal attributes an index may legitimately reference.
const INDEXABLE_INTERNAL: &[&str] = &[FIELD_ID, FIELD_COLLECTION, FIELD_CREATED_AT, FIELD_UPDATED_AT];

/// Validates an index descriptor against a collection's attribute set.
pub struct IndexValidator {
    attributes: Vec<Attribute>,
    description: Mutex<String>,
}

impl IndexValidator {
    pub fn new(collection: &Document) -> Result<Self> {
        Ok(Self {
            attributes: collection_attributes(collection)?,
            description: Mutex::new("Invalid index".to_string()),
        })
    }

    pub fn is_valid(&self, index: &Index) -> bool {
        match self.check(index) {
            Ok(()) => true,
            Err(reason) => {
                *self.description.lock() = reason;
                false
            }
        }
    }

    pub fn description(&self) -> String {
        self.description.lock().clone()
    }

    fn check(&self, index: &Index) -> std::result::Result<(), String> {
        if index.attributes.is_empty() {
            return Err("Index must reference at least one attribute".to_string());
        }

        if index.lengths.len() > index.attributes.len() {
            return Err("Index lengths exceed the referenced attributes".to_string());
        }

        for name in &index.attributes {
            if INDEXABLE_INTERNAL.contains(&name.as_str()) {
                continue;
            }
            let attribute = self
                .attributes
                .iter()
                .find(|a| a.id.eq_ignore_ascii_case(name))
                .ok_or_else(|| format!("Unknown index attribute: '{}'", name))?;

            if index.kind == IndexType::Fulltext && attribute.kind != AttributeType::String {
                return Err(format!(
                    "Fulltext index requires string attributes, '{}' is {}",
                    name, attribute.kind
                ));
            }
        }

        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_common::METADATA;

    fn books_collection() -> Document {
        let mut collection = Document::new();
        collection.set(FIELD_ID, "books");
        collection.set(FIELD_COLLECTION, METADATA);
        collection.set("name", "books");
        collection.set(
            "attributes",
            Value::Array(vec![
                Attribute::new("title", AttributeType::String, 16)
                    .required()
                    .to_value(),
                Attribute::new("year", AttributeType::Integer, 8).to_value(),
                Attribute::new("tags", AttributeType::String, 32).array().to_value(),
                Attribute::new("published", AttributeType::Datetime, 0).to_value(),
            ]),
        );
        collection.set("indexes", Value::Array(vec![]));
        collection
    }

    fn valid_doc() -> Document {
        let mut doc = Document::new();
        doc.set(FIELD_ID, "b1");
        doc.set(FIELD_COLLECTION, "books");
        doc.set("title", "X");
        doc
    }

    #[test]
    fn test_valid_document() {
        let validator = Structure::new(&books_collection()).unwrap();
        assert!(validator.is_valid(&valid_doc()));
    }

    #[test]
    fn test_missing_required() {
        let validator = Structure::new(&books_collection()).unwrap();
        let mut doc = valid_doc();
        doc.remove_attribute("title");
        assert!(!validator.is_valid(&doc));
        assert!(validator.description().contains("title"));
    }

    #[test]
    fn test_unknown_attribute() {
        let validator = Structure::new(&books_collection()).unwrap();
        let mut doc = valid_doc();
        doc.set("publisher", "nobody");
        assert!(!validator.is_valid(&doc));
        assert!(validator.description().contains("publisher"));
    }

    #[test]
    fn test_type_mismatch() {
        let validator = Structure::new(&books_collection()).unwrap();
        let mut doc = valid_doc();
        doc.set("year", "1999");
        assert!(!validator.is_valid(&doc));
        assert!(validator.description().contains("integer"));
    }

    #[test]
    fn test_string_size() {
        let validator = Structure::new(&books_collection()).unwrap();
        let mut doc = valid_doc();
        doc.set("title", "a very long title over sixteen");
        assert!(!validator.is_valid(&doc));
    }

    #[test]
    fn test_array_attribute() {
        let validator = Structure::new(&books_collection()).unwrap();
        let mut doc = valid_doc();
        doc.set("tags", Value::Array(vec!["a".into(), "b".into()]));
        assert!(validator.is_valid(&doc));

        doc.set("tags", "not-an-array");
        assert!(!validator.is_valid(&doc));

        doc.set("tags", Value::Array(vec![Value::Int(1)]));
        assert!(!validator.is_valid(&doc));
    }

    #[test]
    fn test_datetime_attribute() {
        let validator = Structure::new(&books_collection()).unwrap();
        let mut doc = valid_doc();
        doc.set("published", "2023-04-01 10:30:00.000");
        assert!(validator.is_valid(&doc));

        doc.set("published", "whenever");
        assert!(!validator.is_valid(&doc));
    }

    #[test]
    fn test_format_registry() {
        add_format("uppercase", AttributeType::String, |value, _| {
            value
                .as_str()
                .map(|s| s.chars().all(|c| !c.is_ascii_lowercase()))
                .unwrap_or(false)
        });

        assert!(has_format("uppercase", AttributeType::String));
        assert!(!has_format("uppercase", AttributeType::Integer));
        assert!(!has_format("missing", AttributeType::String));

        let mut collection = books_collection();
        if let Some(Value::Array(attrs)) = collection.get_attribute("attributes").cloned() {
            let mut attrs = attrs;
            attrs.push(
                Attribute::new("code", AttributeType::String, 16)
                    .format("uppercase")
                    .to_value(),
            );
            collection.set("attributes", Value::Array(attrs));
        }

        let validator = Structure::new(&collection).unwrap();
        let mut doc = valid_doc();
        doc.set("code", "ABC");
        assert!(validator.is_valid(&doc));
        doc.set("code", "abc");
        assert!(!validator.is_valid(&doc));
    }

    #[test]
    fn test_index_validator() {
        let collection = books_collection();
        let validator = IndexValidator::new(&collection).unwrap();

        assert!(validator.is_valid(&Index::new("by_title", IndexType::Key, vec!["title"])));
        assert!(validator.is_valid(&Index::new("by_id", IndexType::Key, vec!["$id"])));

        assert!(!validator.is_valid(&Index::new("empty", IndexType::Key, vec![])));
        assert!(!validator.is_valid(&Index::new("missing", IndexType::Key, vec!["publisher"])));
        assert!(validator.description().contains("publisher"));

        // fulltext over a non-string attribute
        assert!(!validator.is_valid(&Index::new("ft", IndexType::Fulltext, vec!["year"])));
    }
}
