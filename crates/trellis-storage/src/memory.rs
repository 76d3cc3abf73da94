//! Trellis Memory Adapter - In-Memory Storage Adapter
//!
//! A complete adapter implementation backed by process memory, used for
//! testing and development. Evaluates filter queries, ordering, and cursor
//! pagination directly over stored document snapshots.
//!
//! @version 0.1.0
//! @author Trellis Development Team

use crate::adapter::Adapter;
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::collections::HashMap;
use trellis_common::types::{FIELD_ID, FIELD_INTERNAL_ID};
use trellis_common::{
    Attribute, AttributeType, CursorDirection, Document, Index, Order, Query, QueryMethod,
    Result, TrellisError, Value,
};

// =============================================================================
// Limits
// =============================================================================

/// Capability limits reported by the memory adapter. Tunable so tests can
/// exercise limit enforcement without thousands of attributes.
#[derive(Debug, Clone)]
pub struct MemoryLimits {
    pub attributes: usize,
    pub indexes: usize,
    pub string_size: usize,
    pub int_size: usize,
    pub row_width: usize,
}

impl Default for MemoryLimits {
    fn default() -> Self {
        Self {
            attributes: 1012,
            indexes: 64,
            string_size: 16_777_216,
            int_size: 4_294_967_295,
            row_width: 65_535,
        }
    }
}

// =============================================================================
// Memory Adapter
// =============================================================================

#[derive(Debug, Default)]
struct CollectionStore {
    attributes: Vec<Attribute>,
    indexes: Vec<Index>,
    documents: Vec<Document>,
    next_internal_id: u64,
}

#[derive(Debug, Default)]
struct Store {
    namespace: String,
    default_database: String,
    databases: Vec<String>,
    collections: HashMap<String, CollectionStore>,
}

/// In-memory storage adapter for testing and development.
pub struct MemoryAdapter {
    store: RwLock<Store>,
    limits: MemoryLimits,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self {
            store: RwLock::new(Store {
                namespace: "default".to_string(),
                default_database: "default".to_string(),
                databases: Vec::new(),
                collections: HashMap::new(),
            }),
            limits: MemoryLimits::default(),
        }
    }

    /// Override the reported capability limits.
    pub fn with_limits(mut self, limits: MemoryLimits) -> Self {
        self.limits = limits;
        self
    }

    fn scoped(&self, collection: &str) -> String {
        format!("{}_{}", self.store.read().namespace, collection)
    }

    fn estimate_width(attribute: &Attribute) -> usize {
        let base = match attribute.kind {
            AttributeType::String => attribute.size.max(1),
            AttributeType::Integer | AttributeType::Double => 8,
            AttributeType::Boolean => 1,
            AttributeType::Datetime => 32,
            AttributeType::Relationship => 36,
        };
        // per-column bookkeeping overhead
        base + 8
    }

    fn parse_descriptor_list<T>(
        collection: &Document,
        key: &str,
        parse: fn(&Value) -> Result<T>,
    ) -> Vec<T> {
        match collection.get_attribute(key) {
            Some(Value::Array(items)) => items.iter().filter_map(|v| parse(v).ok()).collect(),
            _ => Vec::new(),
        }
    }
}

impl Default for MemoryAdapter {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Filter Evaluation
// =============================================================================

fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Some(x.cmp(y)),
        (Value::Float(_), _) | (_, Value::Float(_)) | (Value::Int(_), _) | (_, Value::Int(_)) => {
            match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.partial_cmp(&y),
                _ => None,
            }
        }
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn matches_query(document: &Document, query: &Query) -> bool {
    if !query.method().is_filter() {
        return true;
    }

    let Some(attribute) = query.attribute() else {
        return true;
    };
    let value = document.attribute(attribute);

    match query.method() {
        QueryMethod::Equal => query.values().iter().any(|v| *v == value),
        QueryMethod::NotEqual => query.values().iter().all(|v| *v != value),
        QueryMethod::LessThan => {
            compare_values(&value, &query.value()) == Some(Ordering::Less)
        }
        QueryMethod::LessThanEqual => matches!(
            compare_values(&value, &query.value()),
            Some(Ordering::Less) | Some(Ordering::Equal)
        ),
        QueryMethod::GreaterThan => {
            compare_values(&value, &query.value()) == Some(Ordering::Greater)
        }
        QueryMethod::GreaterThanEqual => matches!(
            compare_values(&value, &query.value()),
            Some(Ordering::Greater) | Some(Ordering::Equal)
        ),
        QueryMethod::Contains => match (&value, &query.value()) {
            (Value::Array(items), needle) => items.contains(needle),
            (Value::String(s), Value::String(needle)) => s.contains(needle.as_str()),
            _ => false,
        },
        QueryMethod::Search => match (&value, &query.value()) {
            (Value::String(s), Value::String(needle)) => {
                s.to_lowercase().contains(&needle.to_lowercase())
            }
            _ => false,
        },
        QueryMethod::IsNull => value.is_null(),
        QueryMethod::IsNotNull => !value.is_null(),
        _ => true,
    }
}

fn matches_all(document: &Document, queries: &[Query]) -> bool {
    queries.iter().all(|q| matches_query(document, q))
}

// =============================================================================
// Adapter Implementation
// =============================================================================

impl Adapter for MemoryAdapter {
    fn set_namespace(&self, namespace: &str) -> Result<()> {
        self.store.write().namespace = namespace.to_string();
        Ok(())
    }

    fn namespace(&self) -> String {
        self.store.read().namespace.clone()
    }

    fn set_default_database(&self, database: &str) -> Result<()> {
        self.store.write().default_database = database.to_string();
        Ok(())
    }

    fn default_database(&self) -> String {
        self.store.read().default_database.clone()
    }

    fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn create(&self, name: &str) -> Result<()> {
        let mut store = self.store.write();
        if !store.databases.iter().any(|d| d == name) {
            store.databases.push(name.to_string());
        }
        Ok(())
    }

    fn delete(&self, name: &str) -> Result<()> {
        let mut store = self.store.write();
        store.databases.retain(|d| d != name);
        store.collections.clear();
        Ok(())
    }

    fn list(&self) -> Result<Vec<String>> {
        Ok(self.store.read().databases.clone())
    }

    fn exists(&self, database: &str, collection: Option<&str>) -> Result<bool> {
        let key = collection.map(|c| self.scoped(c));
        let store = self.store.read();
        if !store.databases.iter().any(|d| d == database) {
            return Ok(false);
        }
        match key {
            Some(key) => Ok(store.collections.contains_key(&key)),
            None => Ok(true),
        }
    }

    fn create_collection(
        &self,
        name: &str,
        attributes: &[Attribute],
        indexes: &[Index],
    ) -> Result<()> {
        let key = self.scoped(name);
        let mut store = self.store.write();
        if store.collections.contains_key(&key) {
            return Err(TrellisError::Duplicate(format!(
                "collection '{}' already exists",
                name
            )));
        }
        store.collections.insert(
            key,
            CollectionStore {
                attributes: attributes.to_vec(),
                indexes: indexes.to_vec(),
                documents: Vec::new(),
                next_internal_id: 1,
            },
        );
        tracing::debug!("created collection '{}'", name);
        Ok(())
    }

    fn delete_collection(&self, name: &str) -> Result<()> {
        let key = self.scoped(name);
        let mut store = self.store.write();
        store
            .collections
            .remove(&key)
            .map(|_| ())
            .ok_or_else(|| TrellisError::CollectionNotFound(name.to_string()))
    }

    fn create_attribute(&self, collection: &str, attribute: &Attribute) -> Result<()> {
        let key = self.scoped(collection);
        let mut store = self.store.write();
        let coll = store
            .collections
            .get_mut(&key)
            .ok_or_else(|| TrellisError::CollectionNotFound(collection.to_string()))?;
        if coll.attributes.iter().any(|a| a.id == attribute.id) {
            return Err(TrellisError::Duplicate(format!(
                "attribute '{}' already exists",
                attribute.id
            )));
        }
        coll.attributes.push(attribute.clone());
        Ok(())
    }

    fn update_attribute(&self, collection: &str, attribute: &Attribute) -> Result<()> {
        let key = self.scoped(collection);
        let mut store = self.store.write();
        let coll = store
            .collections
            .get_mut(&key)
            .ok_or_else(|| TrellisError::CollectionNotFound(collection.to_string()))?;
        let slot = coll
            .attributes
            .iter_mut()
            .find(|a| a.id == attribute.id)
            .ok_or_else(|| TrellisError::AttributeNotFound(attribute.id.clone()))?;
        *slot = attribute.clone();
        Ok(())
    }

    fn delete_attribute(&self, collection: &str, id: &str) -> Result<()> {
        let key = self.scoped(collection);
        let mut store = self.store.write();
        let coll = store
            .collections
            .get_mut(&key)
            .ok_or_else(|| TrellisError::CollectionNotFound(collection.to_string()))?;
        coll.attributes.retain(|a| a.id != id);
        for doc in &mut coll.documents {
            doc.remove_attribute(id);
        }
        Ok(())
    }

    fn rename_attribute(&self, collection: &str, old: &str, new: &str) -> Result<()> {
        let key = self.scoped(collection);
        let mut store = self.store.write();
        let coll = store
            .collections
            .get_mut(&key)
            .ok_or_else(|| TrellisError::CollectionNotFound(collection.to_string()))?;
        let slot = coll
            .attributes
            .iter_mut()
            .find(|a| a.id == old)
            .ok_or_else(|| TrellisError::AttributeNotFound(old.to_string()))?;
        slot.id = new.to_string();
        for index in &mut coll.indexes {
            for attr in &mut index.attributes {
                if attr == old {
                    *attr = new.to_string();
                }
            }
        }
        for doc in &mut coll.documents {
            if let Some(value) = doc.remove_attribute(old) {
                doc.set(new, value);
            }
        }
        Ok(())
    }

    fn create_relationship(
        &self,
        collection: &str,
        _related_collection: &str,
        attribute: &Attribute,
    ) -> Result<()> {
        // Rows are schemaless here; recording the descriptor is enough for
        // width accounting and typed counter updates.
        self.create_attribute(collection, attribute)
    }

    fn create_index(&self, collection: &str, index: &Index) -> Result<()> {
        let key = self.scoped(collection);
        let mut store = self.store.write();
        let coll = store
            .collections
            .get_mut(&key)
            .ok_or_else(|| TrellisError::CollectionNotFound(collection.to_string()))?;
        if coll.indexes.iter().any(|i| i.id == index.id) {
            return Err(TrellisError::Duplicate(format!(
                "index '{}' already exists",
                index.id
            )));
        }
        coll.indexes.push(index.clone());
        Ok(())
    }

    fn delete_index(&self, collection: &str, id: &str) -> Result<()> {
        let key = self.scoped(collection);
        let mut store = self.store.write();
        let coll = store
            .collections
            .get_mut(&key)
            .ok_or_else(|| TrellisError::CollectionNotFound(collection.to_string()))?;
        coll.indexes.retain(|i| i.id != id);
        Ok(())
    }

    fn rename_index(&self, collection: &str, old: &str, new: &str) -> Result<()> {
        let key = self.scoped(collection);
        let mut store = self.store.write();
        let coll = store
            .collections
            .get_mut(&key)
            .ok_or_else(|| TrellisError::CollectionNotFound(collection.to_string()))?;
        let slot = coll
            .indexes
            .iter_mut()
            .find(|i| i.id == old)
            .ok_or_else(|| TrellisError::IndexNotFound(old.to_string()))?;
        slot.id = new.to_string();
        Ok(())
    }

    fn get_document(&self, collection: &str, id: &str) -> Result<Document> {
        let key = self.scoped(collection);
        let store = self.store.read();
        let coll = store
            .collections
            .get(&key)
            .ok_or_else(|| TrellisError::CollectionNotFound(collection.to_string()))?;
        Ok(coll
            .documents
            .iter()
            .find(|d| d.id() == id)
            .cloned()
            .unwrap_or_default())
    }

    fn create_document(&self, collection: &str, document: &Document) -> Result<Document> {
        let key = self.scoped(collection);
        let mut store = self.store.write();
        let coll = store
            .collections
            .get_mut(&key)
            .ok_or_else(|| TrellisError::CollectionNotFound(collection.to_string()))?;
        if coll.documents.iter().any(|d| d.id() == document.id()) {
            return Err(TrellisError::Duplicate(format!(
                "document '{}' already exists",
                document.id()
            )));
        }
        let mut stored = document.clone();
        stored.set(FIELD_INTERNAL_ID, coll.next_internal_id.to_string());
        coll.next_internal_id += 1;
        coll.documents.push(stored.clone());
        Ok(stored)
    }

    fn update_document(&self, collection: &str, document: &Document) -> Result<Document> {
        let key = self.scoped(collection);
        let mut store = self.store.write();
        let coll = store
            .collections
            .get_mut(&key)
            .ok_or_else(|| TrellisError::CollectionNotFound(collection.to_string()))?;
        let slot = coll
            .documents
            .iter_mut()
            .find(|d| d.id() == document.id())
            .ok_or_else(|| TrellisError::DocumentNotFound(document.id().to_string()))?;
        let mut stored = document.clone();
        if stored.internal_id().is_empty() {
            stored.set(FIELD_INTERNAL_ID, slot.internal_id().to_string());
        }
        *slot = stored.clone();
        Ok(stored)
    }

    fn delete_document(&self, collection: &str, id: &str) -> Result<()> {
        let key = self.scoped(collection);
        let mut store = self.store.write();
        let coll = store
            .collections
            .get_mut(&key)
            .ok_or_else(|| TrellisError::CollectionNotFound(collection.to_string()))?;
        let before = coll.documents.len();
        coll.documents.retain(|d| d.id() != id);
        if coll.documents.len() == before {
            return Err(TrellisError::DocumentNotFound(id.to_string()));
        }
        Ok(())
    }

    fn increase_document_attribute(
        &self,
        collection: &str,
        id: &str,
        attribute: &str,
        delta: f64,
        min: Option<f64>,
        max: Option<f64>,
    ) -> Result<f64> {
        let key = self.scoped(collection);
        let mut store = self.store.write();
        let coll = store
            .collections
            .get_mut(&key)
            .ok_or_else(|| TrellisError::CollectionNotFound(collection.to_string()))?;
        let integer = coll
            .attributes
            .iter()
            .find(|a| a.id == attribute)
            .map(|a| a.kind == AttributeType::Integer)
            .unwrap_or(false);
        let doc = coll
            .documents
            .iter_mut()
            .find(|d| d.id() == id)
            .ok_or_else(|| TrellisError::DocumentNotFound(id.to_string()))?;

        let current = doc.attribute(attribute).as_f64().unwrap_or(0.0);
        let next = current + delta;
        if let Some(max) = max {
            if next > max {
                return Err(TrellisError::Bound(format!(
                    "attribute '{}' would exceed maximum {}",
                    attribute, max
                )));
            }
        }
        if let Some(min) = min {
            if next < min {
                return Err(TrellisError::Bound(format!(
                    "attribute '{}' would fall below minimum {}",
                    attribute, min
                )));
            }
        }

        let stored_int = matches!(doc.attribute(attribute), Value::Int(_));
        if integer || stored_int {
            doc.set(attribute, Value::Int(next as i64));
        } else {
            doc.set(attribute, Value::Float(next));
        }
        Ok(next)
    }

    fn find(
        &self,
        collection: &str,
        queries: &[Query],
        limit: usize,
        offset: usize,
        order_attributes: &[String],
        order_types: &[Order],
        cursor: Option<&Document>,
        cursor_direction: CursorDirection,
    ) -> Result<Vec<Document>> {
        let key = self.scoped(collection);
        let store = self.store.read();
        let coll = store
            .collections
            .get(&key)
            .ok_or_else(|| TrellisError::CollectionNotFound(collection.to_string()))?;

        let mut matched: Vec<&Document> = coll
            .documents
            .iter()
            .filter(|d| matches_all(d, queries))
            .collect();

        if !order_attributes.is_empty() {
            matched.sort_by(|a, b| {
                for (i, attr) in order_attributes.iter().enumerate() {
                    let order = order_types.get(i).copied().unwrap_or(Order::Asc);
                    let ord = compare_values(&a.attribute(attr), &b.attribute(attr))
                        .unwrap_or(Ordering::Equal);
                    let ord = match order {
                        Order::Asc => ord,
                        Order::Desc => ord.reverse(),
                    };
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                Ordering::Equal
            });
        }

        let window: Vec<Document> = match cursor {
            Some(cursor) => {
                let position = matched
                    .iter()
                    .position(|d| d.get_attribute(FIELD_ID) == cursor.get_attribute(FIELD_ID));
                match position {
                    Some(pos) => match cursor_direction {
                        CursorDirection::After => matched
                            .iter()
                            .skip(pos + 1)
                            .skip(offset)
                            .take(limit)
                            .map(|d| (*d).clone())
                            .collect(),
                        CursorDirection::Before => {
                            let end = pos.saturating_sub(offset);
                            let start = end.saturating_sub(limit);
                            matched[start..end].iter().map(|d| (*d).clone()).collect()
                        }
                    },
                    None => Vec::new(),
                }
            }
            None => matched
                .iter()
                .skip(offset)
                .take(limit)
                .map(|d| (*d).clone())
                .collect(),
        };

        Ok(window)
    }

    fn count(&self, collection: &str, queries: &[Query], max: usize) -> Result<usize> {
        let key = self.scoped(collection);
        let store = self.store.read();
        let coll = store
            .collections
            .get(&key)
            .ok_or_else(|| TrellisError::CollectionNotFound(collection.to_string()))?;
        let count = coll
            .documents
            .iter()
            .filter(|d| matches_all(d, queries))
            .count();
        Ok(if max > 0 { count.min(max) } else { count })
    }

    fn sum(
        &self,
        collection: &str,
        attribute: &str,
        queries: &[Query],
        max: usize,
    ) -> Result<f64> {
        let key = self.scoped(collection);
        let store = self.store.read();
        let coll = store
            .collections
            .get(&key)
            .ok_or_else(|| TrellisError::CollectionNotFound(collection.to_string()))?;
        let matching = coll.documents.iter().filter(|d| matches_all(d, queries));
        let take = if max > 0 { max } else { usize::MAX };
        Ok(matching
            .take(take)
            .filter_map(|d| d.attribute(attribute).as_f64())
            .sum())
    }

    fn get_limit_for_attributes(&self) -> usize {
        self.limits.attributes
    }

    fn get_limit_for_indexes(&self) -> usize {
        self.limits.indexes
    }

    fn get_limit_for_string(&self) -> usize {
        self.limits.string_size
    }

    fn get_limit_for_int(&self) -> usize {
        self.limits.int_size
    }

    fn get_count_of_attributes(&self, collection: &Document) -> usize {
        let attributes =
            Self::parse_descriptor_list(collection, "attributes", Attribute::from_value);
        attributes.len() + self.get_count_of_default_attributes()
    }

    fn get_count_of_indexes(&self, collection: &Document) -> usize {
        let indexes = Self::parse_descriptor_list(collection, "indexes", Index::from_value);
        indexes.len() + self.get_count_of_default_indexes()
    }

    fn get_count_of_default_attributes(&self) -> usize {
        // $id, $internalId, $createdAt, $updatedAt, $permissions
        5
    }

    fn get_count_of_default_indexes(&self) -> usize {
        // primary key, $createdAt, $updatedAt
        3
    }

    fn get_attribute_width(&self, collection: &Document) -> usize {
        let attributes =
            Self::parse_descriptor_list(collection, "attributes", Attribute::from_value);
        let base = 1500; // internal columns
        attributes
            .iter()
            .map(Self::estimate_width)
            .sum::<usize>()
            + base
    }

    fn get_document_size_limit(&self) -> usize {
        self.limits.row_width
    }

    fn get_support_for_index(&self) -> bool {
        true
    }

    fn get_support_for_unique_index(&self) -> bool {
        true
    }

    fn get_support_for_casting(&self) -> bool {
        false
    }

    fn get_keywords(&self) -> Vec<String> {
        Vec::new()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter_with_collection(name: &str) -> MemoryAdapter {
        let adapter = MemoryAdapter::new();
        adapter.create("default").unwrap();
        adapter
            .create_collection(
                name,
                &[
                    Attribute::new("title", AttributeType::String, 128),
                    Attribute::new("year", AttributeType::Integer, 8),
                ],
                &[],
            )
            .unwrap();
        adapter
    }

    fn doc(id: &str, title: &str, year: i64) -> Document {
        let mut d = Document::new();
        d.set(FIELD_ID, id);
        d.set("title", title);
        d.set("year", year);
        d
    }

    #[test]
    fn test_document_crud() {
        let adapter = adapter_with_collection("books");

        let created = adapter.create_document("books", &doc("b1", "X", 1990)).unwrap();
        assert_eq!(created.internal_id(), "1");

        let fetched = adapter.get_document("books", "b1").unwrap();
        assert_eq!(fetched.attribute("title"), Value::String("X".into()));

        let mut updated = fetched.clone();
        updated.set("title", "Y");
        adapter.update_document("books", &updated).unwrap();
        assert_eq!(
            adapter.get_document("books", "b1").unwrap().attribute("title"),
            Value::String("Y".into())
        );

        adapter.delete_document("books", "b1").unwrap();
        assert!(adapter.get_document("books", "b1").unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_document_rejected() {
        let adapter = adapter_with_collection("books");
        adapter.create_document("books", &doc("b1", "X", 1990)).unwrap();
        let err = adapter
            .create_document("books", &doc("b1", "X", 1990))
            .unwrap_err();
        assert_eq!(err.code(), "duplicate");
    }

    #[test]
    fn test_find_filters_and_order() {
        let adapter = adapter_with_collection("books");
        for (id, title, year) in [("b1", "A", 2001), ("b2", "B", 1999), ("b3", "C", 2010)] {
            adapter.create_document("books", &doc(id, title, year)).unwrap();
        }

        let found = adapter
            .find(
                "books",
                &[Query::greater_than("year", 2000i64)],
                25,
                0,
                &["year".to_string()],
                &[Order::Desc],
                None,
                CursorDirection::After,
            )
            .unwrap();
        assert_eq!(
            found.iter().map(|d| d.id().to_string()).collect::<Vec<_>>(),
            vec!["b3", "b1"]
        );
    }

    #[test]
    fn test_find_cursor_pagination() {
        let adapter = adapter_with_collection("books");
        for i in 1..=5 {
            adapter
                .create_document("books", &doc(&format!("b{}", i), "t", 2000 + i))
                .unwrap();
        }

        let cursor = adapter.get_document("books", "b2").unwrap();
        let after = adapter
            .find(
                "books",
                &[],
                2,
                0,
                &[],
                &[],
                Some(&cursor),
                CursorDirection::After,
            )
            .unwrap();
        assert_eq!(
            after.iter().map(|d| d.id().to_string()).collect::<Vec<_>>(),
            vec!["b3", "b4"]
        );

        let cursor = adapter.get_document("books", "b4").unwrap();
        let before = adapter
            .find(
                "books",
                &[],
                2,
                0,
                &[],
                &[],
                Some(&cursor),
                CursorDirection::Before,
            )
            .unwrap();
        assert_eq!(
            before.iter().map(|d| d.id().to_string()).collect::<Vec<_>>(),
            vec!["b2", "b3"]
        );
    }

    #[test]
    fn test_count_and_sum() {
        let adapter = adapter_with_collection("books");
        for (id, year) in [("b1", 10), ("b2", 20), ("b3", 30)] {
            adapter.create_document("books", &doc(id, "t", year)).unwrap();
        }

        assert_eq!(adapter.count("books", &[], 0).unwrap(), 3);
        assert_eq!(adapter.count("books", &[], 2).unwrap(), 2);
        assert_eq!(adapter.sum("books", "year", &[], 0).unwrap(), 60.0);
    }

    #[test]
    fn test_increase_bounds() {
        let adapter = adapter_with_collection("books");
        adapter.create_document("books", &doc("b1", "t", 5)).unwrap();

        let err = adapter
            .increase_document_attribute("books", "b1", "year", 3.0, None, Some(7.0))
            .unwrap_err();
        assert_eq!(err.code(), "bound");

        let value = adapter
            .increase_document_attribute("books", "b1", "year", 2.0, None, Some(7.0))
            .unwrap();
        assert_eq!(value, 7.0);
        assert_eq!(
            adapter.get_document("books", "b1").unwrap().attribute("year"),
            Value::Int(7)
        );
    }

    #[test]
    fn test_rename_attribute_moves_values() {
        let adapter = adapter_with_collection("books");
        adapter.create_document("books", &doc("b1", "X", 1990)).unwrap();
        adapter.rename_attribute("books", "title", "name").unwrap();

        let fetched = adapter.get_document("books", "b1").unwrap();
        assert!(fetched.get_attribute("title").is_none());
        assert_eq!(fetched.attribute("name"), Value::String("X".into()));
    }

    #[test]
    fn test_namespace_scopes_collections() {
        let adapter = MemoryAdapter::new();
        adapter.create("default").unwrap();
        adapter.create_collection("books", &[], &[]).unwrap();

        adapter.set_namespace("tenant2").unwrap();
        assert!(!adapter.exists("default", Some("books")).unwrap());
        adapter.create_collection("books", &[], &[]).unwrap();
        assert!(adapter.exists("default", Some("books")).unwrap());
    }
}
