//! Relationship resolver: hydrates related documents on read and persists
//! relationship values on write, across the four cardinalities. A
//! depth-capped counter breaks two-way hydration cycles; the counter is
//! engine-scoped and unwinds to zero whenever the read chain is exited.

use super::{Database, RELATIONSHIP_MAX_DEPTH};
use crate::authorization::Authorization;
use crate::metadata::collection_attributes;
use std::sync::atomic::{AtomicUsize, Ordering};
use trellis_common::types::{FIELD_ID, FIELD_PERMISSIONS};
use trellis_common::{
    Document, Id, Query, RelationOptions, RelationType, Result, Side, TrellisError, Value,
};
use trellis_storage::Adapter;

/// A relationship attribute value, parsed from its runtime shape.
enum RelationshipValue {
    Null,
    Id(String),
    Doc(Document),
    List(Vec<RelationshipValue>),
}

fn parse_relationship_value(value: &Value) -> Result<RelationshipValue> {
    match value {
        Value::Null => Ok(RelationshipValue::Null),
        Value::String(id) => Ok(RelationshipValue::Id(id.clone())),
        Value::Object(map) => Ok(RelationshipValue::Doc(Document::from_map(map.clone()))),
        Value::Array(items) => {
            let mut parsed = Vec::with_capacity(items.len());
            for item in items {
                match parse_relationship_value(item)? {
                    RelationshipValue::List(_) | RelationshipValue::Null => {
                        return Err(TrellisError::Relationship(
                            "a relationship list may only hold ids and documents".to_string(),
                        ))
                    }
                    single => parsed.push(single),
                }
            }
            Ok(RelationshipValue::List(parsed))
        }
        _ => Err(TrellisError::Relationship(
            "unrecognized relationship value shape".to_string(),
        )),
    }
}

fn into_list(value: RelationshipValue) -> Result<Vec<RelationshipValue>> {
    match value {
        RelationshipValue::Null => Ok(Vec::new()),
        RelationshipValue::List(items) => Ok(items),
        single => Ok(vec![single]),
    }
}

struct DepthGuard<'a>(&'a AtomicUsize);

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl<A: Adapter> Database<A> {
    // -------------------------------------------------------------------------
    // Read-side hydration
    // -------------------------------------------------------------------------

    /// Materialize related documents onto a freshly fetched row.
    pub(crate) fn populate_relationships(
        &self,
        collection: &Document,
        document: &mut Document,
    ) -> Result<()> {
        let related: Vec<(String, RelationOptions)> = collection_attributes(collection)?
            .into_iter()
            .filter_map(|a| a.options.map(|o| (a.id, o)))
            .collect();
        if related.is_empty() {
            return Ok(());
        }

        let depth = self.relationship_depth().fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = DepthGuard(self.relationship_depth());
        if depth > RELATIONSHIP_MAX_DEPTH {
            return Ok(());
        }

        for (attribute, options) in related {
            match (options.relation_type, options.side) {
                // a column on this side holds the related id
                (RelationType::OneToOne, side) => {
                    if side == Side::Child && !options.two_way {
                        document.remove_attribute(&attribute);
                        continue;
                    }
                    self.hydrate_single(&attribute, &options, document)?;
                }
                (RelationType::ManyToOne, Side::Parent) => {
                    self.hydrate_single(&attribute, &options, document)?;
                }
                (RelationType::OneToMany, Side::Child) => {
                    if !options.two_way {
                        document.remove_attribute(&attribute);
                        continue;
                    }
                    self.hydrate_single(&attribute, &options, document)?;
                }

                // the related collection points back at this document
                (RelationType::OneToMany, Side::Parent) => {
                    self.hydrate_many(&attribute, &options, document)?;
                }
                (RelationType::ManyToOne, Side::Child) => {
                    if !options.two_way {
                        document.remove_attribute(&attribute);
                        continue;
                    }
                    self.hydrate_many(&attribute, &options, document)?;
                }

                // junction traversal is deferred at read time
                (RelationType::ManyToMany, _) => {}
            }
        }
        Ok(())
    }

    fn hydrate_single(
        &self,
        attribute: &str,
        options: &RelationOptions,
        document: &mut Document,
    ) -> Result<()> {
        let Value::String(related_id) = document.attribute(attribute) else {
            return Ok(());
        };
        let related = self.get_document(&options.related_collection, &related_id, Vec::new())?;
        let value = if related.is_empty() {
            // cycle cap or missing target; keep the id reference
            Value::String(related_id)
        } else {
            related.to_value()
        };
        document.set(attribute, value);
        Ok(())
    }

    fn hydrate_many(
        &self,
        attribute: &str,
        options: &RelationOptions,
        document: &mut Document,
    ) -> Result<()> {
        let children = self.silent(|| {
            self.find(
                &options.related_collection,
                vec![
                    Query::equal(
                        options.two_way_id.as_str(),
                        vec![Value::String(document.id().to_string())],
                    ),
                    Query::limit(i64::MAX as usize),
                ],
            )
        })?;

        let list: Vec<Value> = children
            .into_iter()
            .map(|mut child| {
                child.remove_attribute(&options.two_way_id);
                child.to_value()
            })
            .collect();
        document.set(attribute, Value::Array(list));
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Write-side persistence
    // -------------------------------------------------------------------------

    /// Persist relationship attribute values and strip them from the parent
    /// row: ids are what the parent persists, never nested documents.
    /// Returns the display values to restore onto the returned document.
    pub(crate) fn persist_relationships(
        &self,
        collection: &Document,
        document: &mut Document,
    ) -> Result<Vec<(String, Value)>> {
        let related: Vec<(String, RelationOptions)> = collection_attributes(collection)?
            .into_iter()
            .filter_map(|a| a.options.map(|o| (a.id, o)))
            .collect();

        let mut restored = Vec::new();
        for (attribute, options) in related {
            if !document.contains(&attribute) {
                continue;
            }
            let raw = document.remove_attribute(&attribute).unwrap_or(Value::Null);
            let parsed = parse_relationship_value(&raw)?;
            let document_id = document.id().to_string();

            match (options.relation_type, options.side) {
                (RelationType::OneToOne, _) => {
                    let related_id = self.resolve_single(&options, parsed)?;
                    if let Some(related_id) = &related_id {
                        if options.two_way {
                            self.backpatch(
                                &options.related_collection,
                                related_id,
                                &options.two_way_id,
                                &document_id,
                            )?;
                        }
                    }
                    if matches!(raw, Value::Object(_)) {
                        restored.push((attribute.clone(), raw));
                    }
                    document.set(
                        attribute.as_str(),
                        related_id.map(Value::String).unwrap_or(Value::Null),
                    );
                }
                (RelationType::ManyToOne, Side::Parent)
                | (RelationType::OneToMany, Side::Child) => {
                    let related_id = self.resolve_single(&options, parsed)?;
                    if matches!(raw, Value::Object(_)) {
                        restored.push((attribute.clone(), raw));
                    }
                    document.set(
                        attribute.as_str(),
                        related_id.map(Value::String).unwrap_or(Value::Null),
                    );
                }
                (RelationType::OneToMany, Side::Parent)
                | (RelationType::ManyToOne, Side::Child) => {
                    for item in into_list(parsed)? {
                        let (related_id, was_id) = self.resolve_item(
                            &options,
                            item,
                            Some((&options.two_way_id, &document_id)),
                        )?;
                        if was_id {
                            self.backpatch(
                                &options.related_collection,
                                &related_id,
                                &options.two_way_id,
                                &document_id,
                            )?;
                        }
                    }
                    restored.push((attribute.clone(), raw));
                }
                (RelationType::ManyToMany, side) => {
                    let junction = match side {
                        Side::Parent => {
                            format!("{}_{}", collection.id(), options.related_collection)
                        }
                        Side::Child => {
                            format!("{}_{}", options.related_collection, collection.id())
                        }
                    };
                    for item in into_list(parsed)? {
                        let (related_id, _) = self.resolve_item(&options, item, None)?;
                        let mut edge = Document::new();
                        edge.set(FIELD_ID, Id::unique());
                        edge.set(attribute.as_str(), related_id);
                        edge.set(options.two_way_id.as_str(), document_id.as_str());
                        edge.set(
                            FIELD_PERMISSIONS,
                            document.attribute(FIELD_PERMISSIONS),
                        );
                        Authorization::skip(|| {
                            self.silent(|| self.create_document(&junction, edge))
                        })?;
                    }
                    restored.push((attribute.clone(), raw));
                }
            }
        }
        Ok(restored)
    }

    /// Resolve a single-valued relationship to the related document id.
    fn resolve_single(
        &self,
        options: &RelationOptions,
        value: RelationshipValue,
    ) -> Result<Option<String>> {
        match value {
            RelationshipValue::Null => Ok(None),
            RelationshipValue::List(_) => Err(TrellisError::Relationship(
                "a single-valued relationship cannot hold a list".to_string(),
            )),
            single => {
                let (id, _) = self.resolve_item(options, single, None)?;
                Ok(Some(id))
            }
        }
    }

    /// Resolve one relationship item: a plain id passes through; a nested
    /// document is created when absent and updated when it diverges from
    /// the stored version.
    fn resolve_item(
        &self,
        options: &RelationOptions,
        item: RelationshipValue,
        preset: Option<(&str, &str)>,
    ) -> Result<(String, bool)> {
        match item {
            RelationshipValue::Id(id) => Ok((id, true)),
            RelationshipValue::Doc(doc) => {
                let stored = self.upsert_related(&options.related_collection, doc, preset)?;
                Ok((stored.id().to_string(), false))
            }
            _ => Err(TrellisError::Relationship(
                "unrecognized relationship value shape".to_string(),
            )),
        }
    }

    fn upsert_related(
        &self,
        collection_id: &str,
        mut document: Document,
        preset: Option<(&str, &str)>,
    ) -> Result<Document> {
        if document.id().is_empty() {
            document.set(FIELD_ID, Id::unique());
        }
        if let Some((key, value)) = preset {
            document.set(key, value);
        }
        let id = document.id().to_string();

        let existing = Authorization::skip(|| {
            self.silent(|| self.get_document(collection_id, &id, Vec::new()))
        })?;

        if existing.is_empty() {
            Authorization::skip(|| self.silent(|| self.create_document(collection_id, document)))
        } else if diverges(&existing, &document) {
            Authorization::skip(|| {
                self.silent(|| self.update_document(collection_id, &id, document))
            })
        } else {
            Ok(existing)
        }
    }

    /// Write the back-pointer column on a related document.
    fn backpatch(
        &self,
        collection_id: &str,
        id: &str,
        attribute: &str,
        value: &str,
    ) -> Result<()> {
        let mut patch = Document::new();
        patch.set(attribute, value);
        Authorization::skip(|| self.silent(|| self.update_document(collection_id, id, patch)))?;
        Ok(())
    }
}

/// Whether an incoming partial document differs from the stored one on any
/// user attribute it carries.
fn diverges(existing: &Document, incoming: &Document) -> bool {
    incoming
        .get_array_copy()
        .iter()
        .any(|(key, value)| !key.starts_with('$') && existing.get_attribute(key) != Some(value))
}
