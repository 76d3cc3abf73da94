//! Trellis Metadata - The Self-Describing Catalog
//!
//! `_metadata` is the catalog collection: every user collection is described
//! by one document in it, carrying the collection's name plus its attribute
//! and index descriptor lists (stored as JSON strings via the `json`
//! filter). The catalog's own schema is hard-coded here and served from
//! memory, never from the adapter or cache.
//!
//! @version 0.1.0
//! @author Trellis Development Team

use crate::filter::FILTER_JSON;
use trellis_common::types::{FIELD_COLLECTION, FIELD_ID, FIELD_PERMISSIONS};
use trellis_common::{Attribute, AttributeType, Document, Index, Result, Value, METADATA};

/// Size of the serialized descriptor columns.
const DESCRIPTOR_SIZE: usize = 1_000_000;

/// The attribute schema of the metadata collection itself.
pub fn metadata_attributes() -> Vec<Attribute> {
    vec![
        Attribute::new("name", AttributeType::String, 256).required(),
        Attribute::new("attributes", AttributeType::String, DESCRIPTOR_SIZE)
            .filters(vec![FILTER_JSON]),
        Attribute::new("indexes", AttributeType::String, DESCRIPTOR_SIZE)
            .filters(vec![FILTER_JSON]),
    ]
}

/// The hard-coded collection document describing `_metadata`.
pub fn metadata_collection() -> Document {
    let mut collection = Document::new();
    collection.set(FIELD_ID, METADATA);
    collection.set(FIELD_COLLECTION, METADATA);
    collection.set("name", METADATA);
    collection.set(
        "attributes",
        Value::Array(metadata_attributes().iter().map(Attribute::to_value).collect()),
    );
    collection.set("indexes", Value::Array(Vec::new()));
    collection.set(FIELD_PERMISSIONS, Value::Array(Vec::new()));
    collection
}

/// Parse the attribute descriptors out of a collection document.
pub fn collection_attributes(collection: &Document) -> Result<Vec<Attribute>> {
    match collection.get_attribute("attributes") {
        Some(Value::Array(items)) => items.iter().map(Attribute::from_value).collect(),
        _ => Ok(Vec::new()),
    }
}

/// Parse the index descriptors out of a collection document.
pub fn collection_indexes(collection: &Document) -> Result<Vec<Index>> {
    match collection.get_attribute("indexes") {
        Some(Value::Array(items)) => items.iter().map(Index::from_value).collect(),
        _ => Ok(Vec::new()),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_collection_is_self_describing() {
        let collection = metadata_collection();
        assert_eq!(collection.id(), METADATA);
        assert_eq!(collection.collection(), METADATA);

        let attributes = collection_attributes(&collection).unwrap();
        let names: Vec<&str> = attributes.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(names, vec!["name", "attributes", "indexes"]);
    }

    #[test]
    fn test_descriptor_columns_use_json_filter() {
        let attributes = metadata_attributes();
        let descriptors = attributes.iter().find(|a| a.id == "attributes").unwrap();
        assert_eq!(descriptors.filters, vec![FILTER_JSON.to_string()]);
        assert_eq!(descriptors.kind, AttributeType::String);
    }

    #[test]
    fn test_collection_descriptor_parsing() {
        let mut collection = metadata_collection();
        collection.set(
            "indexes",
            Value::Array(vec![
                Index::new("by_name", trellis_common::IndexType::Key, vec!["name"]).to_value(),
            ]),
        );
        let indexes = collection_indexes(&collection).unwrap();
        assert_eq!(indexes.len(), 1);
        assert_eq!(indexes[0].id, "by_name");
    }
}
