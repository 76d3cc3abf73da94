//! Document engine: permission-gated CRUD, find/count/sum, and the query
//! normalizer. Within one operation the sequence is strict: gate check,
//! adapter read/write, cache purge/save, event emission.

use super::{
    Database, DEFAULT_LIMIT, EVENT_DOCUMENT_COUNT, EVENT_DOCUMENT_CREATE, EVENT_DOCUMENT_DECREASE,
    EVENT_DOCUMENT_DELETE, EVENT_DOCUMENT_FIND, EVENT_DOCUMENT_INCREASE, EVENT_DOCUMENT_READ,
    EVENT_DOCUMENT_SUM, EVENT_DOCUMENT_UPDATE, TTL,
};
use crate::authorization::Authorization;
use crate::filter::FILTER_DATETIME;
use crate::metadata::{collection_attributes, metadata_collection};
use crate::validation::Structure;
use std::collections::HashSet;
use trellis_common::types::{
    FIELD_COLLECTION, FIELD_CREATED_AT, FIELD_ID, FIELD_INTERNAL_ID, FIELD_PERMISSIONS,
    FIELD_UPDATED_AT, SYSTEM_FIELDS,
};
use trellis_common::{
    datetime, AttributeType, Document, Id, Query, Result, TrellisError, Value, METADATA,
};
use trellis_storage::Adapter;

impl<A: Adapter> Database<A> {
    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Fetch one document. Returns an empty document when `id` is empty,
    /// the document is missing, or the gate denies the read.
    pub fn get_document(
        &self,
        collection_id: &str,
        id: &str,
        queries: Vec<Query>,
    ) -> Result<Document> {
        // the catalog describes itself from memory
        if collection_id == METADATA && id == METADATA {
            return Ok(metadata_collection());
        }

        let collection = self.require_collection(collection_id)?;
        if id.is_empty() {
            return Ok(Document::new());
        }

        let grouped = Query::group_by_type(&queries);
        let selections = self.validate_selections(&collection, &grouped.selections)?;
        let key = self.cache_key(collection_id, id, &selections);

        if let Some(value) = self.cache().load(&key, TTL) {
            let document = Document::from_value(value);
            if collection_id != METADATA && !Authorization::is_valid(&document.get_read()) {
                return Ok(Document::new());
            }
            self.trigger(EVENT_DOCUMENT_READ, document.to_value());
            return Ok(document);
        }

        let mut document = self.adapter().get_document(collection_id, id)?;
        if document.is_empty() {
            return Ok(document);
        }
        document.set(FIELD_COLLECTION, collection_id);

        self.populate_relationships(&collection, &mut document)?;

        if !self.adapter().get_support_for_casting() {
            document = self.cast(&collection, document)?;
        }
        let document = self.decode(&collection, document, &with_system_fields(&selections))?;

        self.cache().save(&key, document.to_value());

        if collection_id != METADATA && !Authorization::is_valid(&document.get_read()) {
            return Ok(Document::new());
        }
        self.trigger(EVENT_DOCUMENT_READ, document.to_value());
        Ok(document)
    }

    /// Find documents matching a query list.
    pub fn find(&self, collection_id: &str, queries: Vec<Query>) -> Result<Vec<Document>> {
        let collection = self.require_collection(collection_id)?;

        let grouped = Query::group_by_type(&queries);
        let selections = self.validate_selections(&collection, &grouped.selections)?;
        self.validate_filters(&collection, &grouped.filters)?;

        let limit = grouped.limit.unwrap_or(DEFAULT_LIMIT);
        let offset = grouped.offset.unwrap_or(0);
        let direction = grouped.cursor_direction.unwrap_or_default();

        let cursor = match grouped.cursor {
            Some(cursor) if !cursor.is_empty() => {
                if cursor.collection() != collection_id {
                    return Err(TrellisError::Query(format!(
                        "cursor document belongs to collection '{}', not '{}'",
                        cursor.collection(),
                        collection_id
                    )));
                }
                Some(self.encode(&collection, cursor)?)
            }
            _ => None,
        };

        // filters and selections travel to the adapter together
        let mut adapter_queries = grouped.filters.clone();
        self.normalize_queries(&collection, &mut adapter_queries)?;
        if !selections.is_empty() {
            adapter_queries.push(Query::select(
                selections.iter().map(String::as_str).collect(),
            ));
        }

        let rows = self.adapter().find(
            collection_id,
            &adapter_queries,
            limit,
            offset,
            &grouped.order_attributes,
            &grouped.order_types,
            cursor.as_ref(),
            direction,
        )?;

        let decode_selections = with_system_fields(&selections);
        let mut documents = Vec::with_capacity(rows.len());
        for mut row in rows {
            row.set(FIELD_COLLECTION, collection_id);
            if !self.adapter().get_support_for_casting() {
                row = self.cast(&collection, row)?;
            }
            documents.push(self.decode(&collection, row, &decode_selections)?);
        }

        self.trigger(
            EVENT_DOCUMENT_FIND,
            Value::Array(documents.iter().map(Document::to_value).collect()),
        );
        Ok(documents)
    }

    /// Find with a forced limit of one.
    pub fn find_one(
        &self,
        collection_id: &str,
        mut queries: Vec<Query>,
    ) -> Result<Option<Document>> {
        queries.push(Query::limit(1));
        Ok(self.find(collection_id, queries)?.into_iter().next())
    }

    /// Count documents matching the filter queries. `max = 0` is unbounded.
    pub fn count(&self, collection_id: &str, queries: Vec<Query>, max: usize) -> Result<usize> {
        let collection = self.require_collection(collection_id)?;
        let grouped = Query::group_by_type(&queries);
        self.validate_filters(&collection, &grouped.filters)?;

        let mut filters = grouped.filters;
        self.normalize_queries(&collection, &mut filters)?;

        let count = self.adapter().count(collection_id, &filters, max)?;
        self.trigger(EVENT_DOCUMENT_COUNT, Value::Int(count as i64));
        Ok(count)
    }

    /// Sum a numeric attribute over matching documents. `max = 0` is
    /// unbounded.
    pub fn sum(
        &self,
        collection_id: &str,
        attribute: &str,
        queries: Vec<Query>,
        max: usize,
    ) -> Result<f64> {
        let collection = self.require_collection(collection_id)?;
        let grouped = Query::group_by_type(&queries);
        self.validate_filters(&collection, &grouped.filters)?;

        let mut filters = grouped.filters;
        self.normalize_queries(&collection, &mut filters)?;

        let sum = self
            .adapter()
            .sum(collection_id, attribute, &filters, max)?;
        self.trigger(EVENT_DOCUMENT_SUM, Value::Float(sum));
        Ok(sum)
    }

    // -------------------------------------------------------------------------
    // Writes
    // -------------------------------------------------------------------------

    /// Create a document. The caller is trusted to have assembled a
    /// permitted document; the gate enforces on subsequent operations.
    pub fn create_document(&self, collection_id: &str, document: Document) -> Result<Document> {
        let collection = self.require_collection(collection_id)?;

        let mut document = document;
        if document.id().is_empty() {
            document.set(FIELD_ID, Id::unique());
        } else {
            Id::validate_key(document.id())?;
        }
        let time = datetime::now();
        document.set(FIELD_CREATED_AT, time.clone());
        document.set(FIELD_UPDATED_AT, time);
        document.set(FIELD_COLLECTION, collection_id);
        if document.get_attribute(FIELD_PERMISSIONS).is_none() {
            document.set(FIELD_PERMISSIONS, Value::Array(Vec::new()));
        }

        let mut document = self.encode(&collection, document)?;

        let validator = Structure::new(&collection)?;
        if !validator.is_valid(&document) {
            return Err(TrellisError::Structure(validator.description()));
        }

        let restored = self.persist_relationships(&collection, &mut document)?;

        let stored = self.adapter().create_document(collection_id, &document)?;
        let mut document = self.decode(&collection, stored, &[])?;
        for (key, value) in restored {
            document.set(key, value);
        }

        self.trigger(EVENT_DOCUMENT_CREATE, document.to_value());
        Ok(document)
    }

    /// Update a document. Authorization is evaluated against the stored
    /// document's permissions, fetched with the gate skipped.
    pub fn update_document(
        &self,
        collection_id: &str,
        id: &str,
        updates: Document,
    ) -> Result<Document> {
        if id.is_empty() {
            return Err(TrellisError::Invalid(
                "a document id is required for update".to_string(),
            ));
        }
        let collection = self.require_collection(collection_id)?;

        let prior = Authorization::skip(|| {
            self.silent(|| self.get_document(collection_id, id, Vec::new()))
        })?;
        if prior.is_empty() {
            return Err(TrellisError::DocumentNotFound(id.to_string()));
        }
        if collection_id != METADATA && !Authorization::is_valid(&prior.get_update()) {
            return Err(TrellisError::Authorization(format!(
                "missing update permission for document '{}'",
                id
            )));
        }

        // merge the caller's attributes over the stored document
        let mut document = prior;
        for (key, value) in updates.into_map() {
            if matches!(
                key.as_str(),
                FIELD_ID | FIELD_INTERNAL_ID | FIELD_COLLECTION | FIELD_CREATED_AT
            ) {
                continue;
            }
            document.set(key, value);
        }
        document.set(FIELD_UPDATED_AT, datetime::now());

        let mut document = self.encode(&collection, document)?;

        let validator = Structure::new(&collection)?;
        if !validator.is_valid(&document) {
            return Err(TrellisError::Structure(validator.description()));
        }

        let restored = self.persist_relationships(&collection, &mut document)?;

        let stored = self.adapter().update_document(collection_id, &document)?;
        self.purge_cached_document(collection_id, id);

        let mut document = self.decode(&collection, stored, &[])?;
        for (key, value) in restored {
            document.set(key, value);
        }

        self.trigger(EVENT_DOCUMENT_UPDATE, document.to_value());
        Ok(document)
    }

    /// Delete a document. Authorization is evaluated against the stored
    /// document's permissions.
    pub fn delete_document(&self, collection_id: &str, id: &str) -> Result<Document> {
        self.require_collection(collection_id)?;

        let prior = Authorization::skip(|| {
            self.silent(|| self.get_document(collection_id, id, Vec::new()))
        })?;
        if prior.is_empty() {
            return Err(TrellisError::DocumentNotFound(id.to_string()));
        }
        if collection_id != METADATA && !Authorization::is_valid(&prior.get_delete()) {
            return Err(TrellisError::Authorization(format!(
                "missing delete permission for document '{}'",
                id
            )));
        }

        self.purge_cached_document(collection_id, id);
        self.adapter().delete_document(collection_id, id)?;

        self.trigger(EVENT_DOCUMENT_DELETE, prior.to_value());
        Ok(prior)
    }

    /// Add to a numeric attribute, bounded above by `max`. Returns the new
    /// value.
    pub fn increase_document_attribute(
        &self,
        collection_id: &str,
        id: &str,
        attribute: &str,
        value: f64,
        max: Option<f64>,
    ) -> Result<f64> {
        if value <= 0.0 {
            return Err(TrellisError::Invalid(
                "the increase value must be a positive number".to_string(),
            ));
        }
        let result = self.shift_document_attribute(collection_id, id, attribute, value, None, max)?;
        self.trigger(EVENT_DOCUMENT_INCREASE, Value::Float(result));
        Ok(result)
    }

    /// Subtract from a numeric attribute, bounded below by `min`. Returns
    /// the new value.
    pub fn decrease_document_attribute(
        &self,
        collection_id: &str,
        id: &str,
        attribute: &str,
        value: f64,
        min: Option<f64>,
    ) -> Result<f64> {
        if value <= 0.0 {
            return Err(TrellisError::Invalid(
                "the decrease value must be a positive number".to_string(),
            ));
        }
        let result = self.shift_document_attribute(collection_id, id, attribute, -value, min, None)?;
        self.trigger(EVENT_DOCUMENT_DECREASE, Value::Float(result));
        Ok(result)
    }

    fn shift_document_attribute(
        &self,
        collection_id: &str,
        id: &str,
        attribute: &str,
        delta: f64,
        min: Option<f64>,
        max: Option<f64>,
    ) -> Result<f64> {
        let collection = self.require_collection(collection_id)?;
        let descriptor = collection_attributes(&collection)?
            .into_iter()
            .find(|a| a.id == attribute)
            .ok_or_else(|| TrellisError::AttributeNotFound(attribute.to_string()))?;
        if !matches!(
            descriptor.kind,
            AttributeType::Integer | AttributeType::Double
        ) {
            return Err(TrellisError::Invalid(format!(
                "attribute '{}' must be an integer or double to shift",
                attribute
            )));
        }

        let prior = Authorization::skip(|| {
            self.silent(|| self.get_document(collection_id, id, Vec::new()))
        })?;
        if prior.is_empty() {
            return Err(TrellisError::DocumentNotFound(id.to_string()));
        }
        if collection_id != METADATA && !Authorization::is_valid(&prior.get_update()) {
            return Err(TrellisError::Authorization(format!(
                "missing update permission for document '{}'",
                id
            )));
        }

        let current = prior.attribute(attribute).as_f64().unwrap_or(0.0);
        if let Some(max) = max {
            if current + delta > max {
                return Err(TrellisError::Bound(format!(
                    "attribute '{}' cannot exceed {}",
                    attribute, max
                )));
            }
        }
        if let Some(min) = min {
            if current + delta < min {
                return Err(TrellisError::Bound(format!(
                    "attribute '{}' cannot fall below {}",
                    attribute, min
                )));
            }
        }

        let result = self
            .adapter()
            .increase_document_attribute(collection_id, id, attribute, delta, min, max)?;
        self.purge_cached_document(collection_id, id);
        Ok(result)
    }

    // -------------------------------------------------------------------------
    // Query validation and normalization
    // -------------------------------------------------------------------------

    /// Reject selections naming attributes the collection does not carry.
    fn validate_selections(
        &self,
        collection: &Document,
        selections: &[String],
    ) -> Result<Vec<String>> {
        if selections.is_empty() {
            return Ok(Vec::new());
        }
        let known: HashSet<String> = collection_attributes(collection)?
            .into_iter()
            .map(|a| a.id)
            .collect();
        for selection in selections {
            if !known.contains(selection) && !SYSTEM_FIELDS.contains(&selection.as_str()) {
                return Err(TrellisError::Query(format!(
                    "cannot select unknown attribute '{}'",
                    selection
                )));
            }
        }
        Ok(selections.to_vec())
    }

    /// Reject filters over attributes the collection does not carry.
    fn validate_filters(&self, collection: &Document, filters: &[Query]) -> Result<()> {
        let known: HashSet<String> = collection_attributes(collection)?
            .into_iter()
            .map(|a| a.id)
            .collect();
        for filter in filters {
            if let Some(attribute) = filter.attribute() {
                if !known.contains(attribute) && !SYSTEM_FIELDS.contains(&attribute) {
                    return Err(TrellisError::Query(format!(
                        "cannot query unknown attribute '{}'",
                        attribute
                    )));
                }
            }
        }
        Ok(())
    }

    /// Rewrite filter values over datetime attributes into the canonical
    /// backend zone so adapter comparisons are consistent.
    fn normalize_queries(&self, collection: &Document, queries: &mut [Query]) -> Result<()> {
        let mut datetime_attributes: HashSet<String> = collection_attributes(collection)?
            .into_iter()
            .filter(|a| a.kind == AttributeType::Datetime)
            .map(|a| a.id)
            .collect();
        datetime_attributes.insert(FIELD_CREATED_AT.to_string());
        datetime_attributes.insert(FIELD_UPDATED_AT.to_string());

        let filter = self.resolve_filter(FILTER_DATETIME)?;
        let context = Document::new();

        for query in queries.iter_mut() {
            if !query.method().is_filter() {
                continue;
            }
            let Some(attribute) = query.attribute() else {
                continue;
            };
            if !datetime_attributes.contains(attribute) {
                continue;
            }
            let values = query
                .values()
                .iter()
                .cloned()
                .map(|v| filter.encode(v, &context))
                .collect::<Result<Vec<Value>>>()?;
            query.set_values(values);
        }
        Ok(())
    }
}

fn with_system_fields(selections: &[String]) -> Vec<String> {
    if selections.is_empty() {
        return Vec::new();
    }
    let mut augmented = selections.to_vec();
    for field in SYSTEM_FIELDS {
        if !augmented.iter().any(|s| s == field) {
            augmented.push(field.to_string());
        }
    }
    augmented
}
