//! Schema manager: collection, attribute, index, and relationship DDL.
//!
//! Every operation follows the same contract: load the collection metadata,
//! validate the change against adapter limits and uniqueness rules, perform
//! the adapter mutation, mirror it into the `_metadata` document (unless the
//! target is the catalog itself), and emit the matching event.

use super::{
    Database, EVENT_ATTRIBUTE_CREATE, EVENT_ATTRIBUTE_DELETE, EVENT_ATTRIBUTE_UPDATE,
    EVENT_COLLECTION_CREATE, EVENT_COLLECTION_DELETE, EVENT_COLLECTION_LIST, EVENT_INDEX_CREATE,
    EVENT_INDEX_DELETE, EVENT_INDEX_RENAME,
};
use crate::authorization::Authorization;
use crate::filter::FILTER_DATETIME;
use crate::metadata::{collection_attributes, collection_indexes};
use crate::validation::{has_format, IndexValidator};
use trellis_common::types::{FIELD_COLLECTION, FIELD_ID, FIELD_PERMISSIONS};
use trellis_common::{
    Attribute, AttributeType, Document, Id, Index, IndexType, Permission, Query, RelationOptions,
    RelationType, Result, Role, Side, TrellisError, Value, METADATA, ON_ACTION_RESTRICT,
};
use trellis_storage::Adapter;

impl<A: Adapter> Database<A> {
    // -------------------------------------------------------------------------
    // Collections
    // -------------------------------------------------------------------------

    /// Create a collection with optional initial attributes and indexes.
    pub fn create_collection(
        &self,
        id: &str,
        attributes: Vec<Attribute>,
        indexes: Vec<Index>,
        permissions: Option<Vec<String>>,
    ) -> Result<Document> {
        Id::validate_key(id)?;
        self.reject_keyword(id)?;

        let existing = self.load_collection(id)?;
        if !existing.is_empty() && id != METADATA {
            return Err(TrellisError::Duplicate(format!(
                "collection '{}' already exists",
                id
            )));
        }

        let mut attributes = attributes;
        for attribute in &mut attributes {
            Id::validate_key(&attribute.id)?;
            self.validate_attribute_descriptor(attribute)?;
        }

        let permissions = permissions.unwrap_or_else(|| {
            vec![
                Permission::create(Role::any()),
                Permission::read(Role::any()),
                Permission::update(Role::any()),
                Permission::delete(Role::any()),
            ]
        });

        let mut collection = Document::new();
        collection.set(FIELD_ID, id);
        collection.set(FIELD_COLLECTION, METADATA);
        collection.set("name", id);
        set_attributes(&mut collection, &attributes);
        set_indexes(&mut collection, &indexes);
        collection.set(
            FIELD_PERMISSIONS,
            Value::Array(permissions.into_iter().map(Value::from).collect()),
        );

        self.check_descriptor_limits(&collection)?;

        let validator = IndexValidator::new(&collection)?;
        for index in &indexes {
            Id::validate_key(&index.id)?;
            if !validator.is_valid(index) {
                return Err(TrellisError::Invalid(validator.description()));
            }
        }

        self.adapter().create_collection(id, &attributes, &indexes)?;

        if id != METADATA {
            let stored = Authorization::skip(|| {
                self.silent(|| self.create_document(METADATA, collection.clone()))
            })?;
            collection = stored;
        }

        tracing::info!("created collection '{}'", id);
        self.trigger(EVENT_COLLECTION_CREATE, collection.to_value());
        Ok(collection)
    }

    /// Delete a collection: read its metadata document, drop it from the
    /// adapter, then drop the metadata document.
    pub fn delete_collection(&self, id: &str) -> Result<Document> {
        if id == METADATA {
            return Err(TrellisError::Invalid(
                "the metadata collection cannot be deleted".to_string(),
            ));
        }

        let collection = self.require_collection(id)?;

        self.adapter().delete_collection(id)?;
        Authorization::skip(|| self.silent(|| self.delete_document(METADATA, id)))?;
        self.purge_cached_collection(id);

        tracing::info!("deleted collection '{}'", id);
        self.trigger(EVENT_COLLECTION_DELETE, collection.to_value());
        Ok(collection)
    }

    /// List collection metadata documents. Administrative: the permission
    /// gate is disabled for the listing and reset afterwards.
    pub fn list_collections(&self, queries: Vec<Query>) -> Result<Vec<Document>> {
        let collections =
            Authorization::disabled(|| self.silent(|| self.find(METADATA, queries)))?;
        self.trigger(
            EVENT_COLLECTION_LIST,
            Value::Array(collections.iter().map(Document::to_value).collect()),
        );
        Ok(collections)
    }

    // -------------------------------------------------------------------------
    // Attributes
    // -------------------------------------------------------------------------

    /// Add an attribute to a collection.
    pub fn create_attribute(&self, collection_id: &str, attribute: Attribute) -> Result<Attribute> {
        let collection = self.require_collection(collection_id)?;
        Id::validate_key(&attribute.id)?;

        let mut attributes = collection_attributes(&collection)?;
        assert_unique(
            attributes.iter().map(|a| a.id.as_str()),
            &attribute.id,
            "attribute",
        )?;

        let mut attribute = attribute;
        self.validate_attribute_descriptor(&mut attribute)?;

        let mut probe = collection.clone();
        attributes.push(attribute.clone());
        set_attributes(&mut probe, &attributes);
        self.check_descriptor_limits(&probe)?;

        self.adapter().create_attribute(collection_id, &attribute)?;
        self.persist_collection(&probe)?;

        self.trigger(EVENT_ATTRIBUTE_CREATE, attribute.to_value());
        Ok(attribute)
    }

    /// Replace an attribute's structural definition in the adapter and the
    /// catalog.
    pub fn update_attribute(&self, collection_id: &str, attribute: Attribute) -> Result<Attribute> {
        let collection = self.require_collection(collection_id)?;

        let mut attributes = collection_attributes(&collection)?;
        let slot = attributes
            .iter_mut()
            .find(|a| a.id == attribute.id)
            .ok_or_else(|| TrellisError::AttributeNotFound(attribute.id.clone()))?;

        let mut attribute = attribute;
        self.validate_attribute_descriptor(&mut attribute)?;
        *slot = attribute.clone();

        let mut probe = collection.clone();
        set_attributes(&mut probe, &attributes);
        self.check_descriptor_limits(&probe)?;

        self.adapter().update_attribute(collection_id, &attribute)?;
        self.persist_collection(&probe)?;

        self.trigger(EVENT_ATTRIBUTE_UPDATE, attribute.to_value());
        Ok(attribute)
    }

    /// Toggle an attribute's `required` flag. Catalog-only.
    pub fn update_attribute_required(
        &self,
        collection_id: &str,
        id: &str,
        required: bool,
    ) -> Result<Attribute> {
        self.update_attribute_meta(collection_id, id, |attribute| {
            attribute.required = required;
            Ok(())
        })
    }

    /// Change an attribute's default value. Catalog-only.
    pub fn update_attribute_default(
        &self,
        collection_id: &str,
        id: &str,
        default: Value,
    ) -> Result<Attribute> {
        self.update_attribute_meta(collection_id, id, |attribute| {
            attribute.default = default;
            Ok(())
        })
    }

    /// Change an attribute's format. Catalog-only.
    pub fn update_attribute_format(
        &self,
        collection_id: &str,
        id: &str,
        format: String,
        format_options: Value,
    ) -> Result<Attribute> {
        self.update_attribute_meta(collection_id, id, |attribute| {
            attribute.format = format;
            attribute.format_options = format_options;
            Ok(())
        })
    }

    /// Replace an attribute's filter chain. Catalog-only.
    pub fn update_attribute_filters(
        &self,
        collection_id: &str,
        id: &str,
        filters: Vec<String>,
    ) -> Result<Attribute> {
        self.update_attribute_meta(collection_id, id, |attribute| {
            attribute.filters = filters;
            Ok(())
        })
    }

    /// Remove an attribute from a collection.
    pub fn delete_attribute(&self, collection_id: &str, id: &str) -> Result<()> {
        let collection = self.require_collection(collection_id)?;

        let mut attributes = collection_attributes(&collection)?;
        let position = attributes
            .iter()
            .position(|a| a.id == id)
            .ok_or_else(|| TrellisError::AttributeNotFound(id.to_string()))?;
        let removed = attributes.remove(position);

        self.adapter().delete_attribute(collection_id, id)?;

        let mut probe = collection;
        set_attributes(&mut probe, &attributes);
        self.persist_collection(&probe)?;

        self.trigger(EVENT_ATTRIBUTE_DELETE, removed.to_value());
        Ok(())
    }

    /// Rename an attribute, rewriting index attribute lists that mention it.
    pub fn rename_attribute(&self, collection_id: &str, old: &str, new: &str) -> Result<()> {
        let collection = self.require_collection(collection_id)?;
        Id::validate_key(new)?;

        let mut attributes = collection_attributes(&collection)?;
        if !attributes.iter().any(|a| a.id == old) {
            return Err(TrellisError::AttributeNotFound(old.to_string()));
        }
        assert_unique(attributes.iter().map(|a| a.id.as_str()), new, "attribute")?;

        self.adapter().rename_attribute(collection_id, old, new)?;

        for attribute in &mut attributes {
            if attribute.id == old {
                attribute.id = new.to_string();
            }
        }
        let mut indexes = collection_indexes(&collection)?;
        for index in &mut indexes {
            for name in &mut index.attributes {
                if name == old {
                    *name = new.to_string();
                }
            }
        }

        let mut probe = collection;
        set_attributes(&mut probe, &attributes);
        set_indexes(&mut probe, &indexes);
        self.persist_collection(&probe)?;

        self.trigger(
            EVENT_ATTRIBUTE_UPDATE,
            Value::String(format!("{} -> {}", old, new)),
        );
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Indexes
    // -------------------------------------------------------------------------

    /// Create an index on a collection.
    pub fn create_index(&self, collection_id: &str, index: Index) -> Result<Index> {
        let collection = self.require_collection(collection_id)?;
        Id::validate_key(&index.id)?;

        if !self.adapter().get_support_for_index() {
            return Err(TrellisError::UnsupportedIndex(
                "the adapter does not support indexes".to_string(),
            ));
        }
        if matches!(index.kind, IndexType::Unique | IndexType::Fulltext)
            && !self.adapter().get_support_for_unique_index()
        {
            return Err(TrellisError::UnsupportedIndex(format!(
                "the adapter does not support {} indexes",
                index.kind
            )));
        }

        let mut indexes = collection_indexes(&collection)?;
        assert_unique(indexes.iter().map(|i| i.id.as_str()), &index.id, "index")?;

        let validator = IndexValidator::new(&collection)?;
        if !validator.is_valid(&index) {
            return Err(TrellisError::Invalid(validator.description()));
        }

        indexes.push(index.clone());
        let mut probe = collection;
        set_indexes(&mut probe, &indexes);
        self.check_descriptor_limits(&probe)?;

        self.adapter().create_index(collection_id, &index)?;
        self.persist_collection(&probe)?;

        self.trigger(EVENT_INDEX_CREATE, index.to_value());
        Ok(index)
    }

    /// Delete an index from a collection.
    pub fn delete_index(&self, collection_id: &str, id: &str) -> Result<()> {
        let collection = self.require_collection(collection_id)?;

        let mut indexes = collection_indexes(&collection)?;
        let position = indexes
            .iter()
            .position(|i| i.id == id)
            .ok_or_else(|| TrellisError::IndexNotFound(id.to_string()))?;
        let removed = indexes.remove(position);

        self.adapter().delete_index(collection_id, id)?;

        let mut probe = collection;
        set_indexes(&mut probe, &indexes);
        self.persist_collection(&probe)?;

        self.trigger(EVENT_INDEX_DELETE, removed.to_value());
        Ok(())
    }

    /// Rename an index.
    pub fn rename_index(&self, collection_id: &str, old: &str, new: &str) -> Result<()> {
        let collection = self.require_collection(collection_id)?;
        Id::validate_key(new)?;

        let mut indexes = collection_indexes(&collection)?;
        if !indexes.iter().any(|i| i.id == old) {
            return Err(TrellisError::IndexNotFound(old.to_string()));
        }
        assert_unique(indexes.iter().map(|i| i.id.as_str()), new, "index")?;

        self.adapter().rename_index(collection_id, old, new)?;

        for index in &mut indexes {
            if index.id == old {
                index.id = new.to_string();
            }
        }
        let mut probe = collection;
        set_indexes(&mut probe, &indexes);
        self.persist_collection(&probe)?;

        self.trigger(
            EVENT_INDEX_RENAME,
            Value::String(format!("{} -> {}", old, new)),
        );
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Relationships
    // -------------------------------------------------------------------------

    /// Create a relationship between two collections. The related collection
    /// receives the mirror attribute with swapped ids; `manyToMany`
    /// additionally owns a junction collection.
    #[allow(clippy::too_many_arguments)]
    pub fn create_relationship(
        &self,
        collection_id: &str,
        related_collection_id: &str,
        relation_type: RelationType,
        two_way: bool,
        id: Option<&str>,
        two_way_id: Option<&str>,
        on_update: Option<&str>,
        on_delete: Option<&str>,
    ) -> Result<Attribute> {
        let collection = self.require_collection(collection_id)?;
        let related = self.require_collection(related_collection_id)?;

        let id = id.unwrap_or(related_collection_id).to_string();
        let two_way_id = two_way_id.unwrap_or(collection_id).to_string();
        Id::validate_key(&id)?;
        Id::validate_key(&two_way_id)?;

        let attributes = collection_attributes(&collection)?;
        assert_unique(attributes.iter().map(|a| a.id.as_str()), &id, "attribute")?;
        let related_attributes = collection_attributes(&related)?;
        assert_unique(
            related_attributes.iter().map(|a| a.id.as_str()),
            &two_way_id,
            "attribute",
        )?;

        let on_update = on_update.unwrap_or(ON_ACTION_RESTRICT).to_string();
        let on_delete = on_delete.unwrap_or(ON_ACTION_RESTRICT).to_string();

        let mut parent = Attribute::new(id.as_str(), AttributeType::Relationship, 0);
        parent.options = Some(RelationOptions {
            related_collection: related_collection_id.to_string(),
            relation_type,
            two_way,
            two_way_id: two_way_id.clone(),
            on_update: on_update.clone(),
            on_delete: on_delete.clone(),
            side: Side::Parent,
        });

        let mut child = Attribute::new(two_way_id.as_str(), AttributeType::Relationship, 0);
        child.options = Some(RelationOptions {
            related_collection: collection_id.to_string(),
            relation_type,
            two_way,
            two_way_id: id.clone(),
            on_update,
            on_delete,
            side: Side::Child,
        });

        self.adapter()
            .create_relationship(collection_id, related_collection_id, &parent)?;

        let mut probe = collection;
        let mut attributes = attributes;
        attributes.push(parent.clone());
        set_attributes(&mut probe, &attributes);
        self.persist_collection(&probe)?;

        let mut related_probe = related;
        let mut related_attributes = related_attributes;
        related_attributes.push(child);
        set_attributes(&mut related_probe, &related_attributes);
        self.persist_collection(&related_probe)?;

        if relation_type == RelationType::ManyToMany {
            let junction = format!("{}_{}", collection_id, related_collection_id);
            self.silent(|| {
                self.create_collection(
                    &junction,
                    vec![
                        Attribute::new(id.as_str(), AttributeType::String, 36).required(),
                        Attribute::new(two_way_id.as_str(), AttributeType::String, 36).required(),
                    ],
                    vec![
                        Index::new(format!("index_{}", id), IndexType::Key, vec![id.as_str()]),
                        Index::new(
                            format!("index_{}", two_way_id),
                            IndexType::Key,
                            vec![two_way_id.as_str()],
                        ),
                    ],
                    None,
                )
            })?;
        }

        self.trigger(EVENT_ATTRIBUTE_CREATE, parent.to_value());
        Ok(parent)
    }

    // -------------------------------------------------------------------------
    // Shared helpers
    // -------------------------------------------------------------------------

    pub(crate) fn require_collection(&self, id: &str) -> Result<Document> {
        let collection = self.load_collection(id)?;
        if collection.is_empty() {
            return Err(TrellisError::CollectionNotFound(id.to_string()));
        }
        Ok(collection)
    }

    fn reject_keyword(&self, id: &str) -> Result<()> {
        if self
            .adapter()
            .get_keywords()
            .iter()
            .any(|k| k.eq_ignore_ascii_case(id))
        {
            return Err(TrellisError::InvalidId(format!(
                "'{}' is a reserved keyword",
                id
            )));
        }
        Ok(())
    }

    /// Normalize and validate one attribute descriptor: type size ceilings,
    /// required/default exclusivity, mandatory filters, format registration.
    fn validate_attribute_descriptor(&self, attribute: &mut Attribute) -> Result<()> {
        match attribute.kind {
            AttributeType::String => {
                let limit = self.adapter().get_limit_for_string();
                if limit > 0 && attribute.size > limit {
                    return Err(TrellisError::Limit(format!(
                        "string attribute size {} exceeds the adapter maximum {}",
                        attribute.size, limit
                    )));
                }
            }
            AttributeType::Integer => {
                let limit =
                    self.adapter().get_limit_for_int() / if attribute.signed { 2 } else { 1 };
                if limit > 0 && attribute.size > limit {
                    return Err(TrellisError::Limit(format!(
                        "integer attribute size {} exceeds the adapter maximum {}",
                        attribute.size, limit
                    )));
                }
            }
            AttributeType::Relationship => {
                if attribute.options.is_none() {
                    return Err(TrellisError::Invalid(format!(
                        "relationship attribute '{}' is missing its options",
                        attribute.id
                    )));
                }
            }
            _ => {}
        }

        if attribute.required && !attribute.default.is_null() {
            return Err(TrellisError::Invalid(
                "Cannot set a default value on a required attribute".to_string(),
            ));
        }

        if attribute.kind == AttributeType::Datetime
            && !attribute.filters.iter().any(|f| f == FILTER_DATETIME)
        {
            attribute.filters.push(FILTER_DATETIME.to_string());
        }

        if !attribute.format.is_empty() && !has_format(&attribute.format, attribute.kind) {
            return Err(TrellisError::UnknownFormat(format!(
                "format '{}' is not registered for attribute type '{}'",
                attribute.format, attribute.kind
            )));
        }

        Ok(())
    }

    /// Enforce the adapter's attribute count, index count, and row width
    /// ceilings for a (possibly hypothetical) collection document.
    fn check_descriptor_limits(&self, collection: &Document) -> Result<()> {
        let limit = self.adapter().get_limit_for_attributes();
        if limit > 0 && self.adapter().get_count_of_attributes(collection) > limit {
            return Err(TrellisError::Limit(format!(
                "collection '{}' cannot hold more than {} attributes",
                collection.id(),
                limit
            )));
        }

        let index_limit = self.adapter().get_limit_for_indexes();
        if index_limit > 0 && self.adapter().get_count_of_indexes(collection) > index_limit {
            return Err(TrellisError::Limit(format!(
                "collection '{}' cannot hold more than {} indexes",
                collection.id(),
                index_limit
            )));
        }

        let width_limit = self.adapter().get_document_size_limit();
        if width_limit > 0 && self.adapter().get_attribute_width(collection) > width_limit {
            return Err(TrellisError::Limit(format!(
                "collection '{}' row width exceeds the adapter maximum {}",
                collection.id(),
                width_limit
            )));
        }

        Ok(())
    }

    /// Write a mutated collection document back into the catalog. The
    /// catalog's own descriptor is never mirrored.
    fn persist_collection(&self, collection: &Document) -> Result<()> {
        if collection.id() == METADATA {
            return Ok(());
        }
        Authorization::skip(|| {
            self.silent(|| {
                self.update_document(METADATA, collection.id(), collection.clone())
            })
        })?;
        Ok(())
    }

    fn update_attribute_meta(
        &self,
        collection_id: &str,
        id: &str,
        mutate: impl FnOnce(&mut Attribute) -> Result<()>,
    ) -> Result<Attribute> {
        let collection = self.require_collection(collection_id)?;

        let mut attributes = collection_attributes(&collection)?;
        let slot = attributes
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| TrellisError::AttributeNotFound(id.to_string()))?;
        mutate(slot)?;
        self.validate_attribute_descriptor(slot)?;
        let updated = slot.clone();

        let mut probe = collection;
        set_attributes(&mut probe, &attributes);
        self.persist_collection(&probe)?;

        self.trigger(EVENT_ATTRIBUTE_UPDATE, updated.to_value());
        Ok(updated)
    }
}

fn set_attributes(collection: &mut Document, attributes: &[Attribute]) {
    collection.set(
        "attributes",
        Value::Array(attributes.iter().map(Attribute::to_value).collect()),
    );
}

fn set_indexes(collection: &mut Document, indexes: &[Index]) {
    collection.set(
        "indexes",
        Value::Array(indexes.iter().map(Index::to_value).collect()),
    );
}

/// Case-insensitive uniqueness check for attribute and index ids.
fn assert_unique<'a>(
    existing: impl Iterator<Item = &'a str>,
    candidate: &str,
    what: &str,
) -> Result<()> {
    for id in existing {
        if id.eq_ignore_ascii_case(candidate) {
            return Err(TrellisError::Duplicate(format!(
                "{} '{}' already exists",
                what, candidate
            )));
        }
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
