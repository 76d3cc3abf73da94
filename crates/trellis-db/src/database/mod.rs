//! Trellis Database - The Schema-Managed Façade
//!
//! `Database` owns the semantics the storage adapter does not: the metadata
//! catalog, the encode/decode filter pipeline, the permission gate, the
//! write-through document cache, relationship traversal, and query
//! normalization. One instance is a single logical actor; instances sharing
//! a namespace, adapter, and cache coordinate through the backend itself.
//!
//! Key Features:
//! - Event bus with named listeners, `"*"` channel, and silent scopes
//! - Selection-aware cache keys with wildcard family purges
//! - Metadata catalog access with the hard-coded `_metadata` shortcut
//! - Database lifecycle (create/exists/ping/delete)
//!
//! @version 0.1.0
//! @author Trellis Development Team

mod codec;
mod documents;
mod relationships;
mod schema;

use crate::authorization::Authorization;
use crate::filter::{ensure_builtin_filters, shared_filter, AttributeFilter};
use crate::metadata::{metadata_attributes, metadata_collection};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use trellis_common::{utils, Document, Result, TrellisError, Value, METADATA};
use trellis_storage::{Adapter, Cache};

// =============================================================================
// Constants
// =============================================================================

/// Default cache entry lifetime, in seconds.
pub const TTL: u64 = 86_400;

/// Default page size for find operations.
pub const DEFAULT_LIMIT: usize = 25;

/// Two-way relationship hydration depth cap.
pub const RELATIONSHIP_MAX_DEPTH: usize = 2;

// Event channels. `EVENT_ALL` listeners observe every emission.
pub const EVENT_ALL: &str = "*";
pub const EVENT_DATABASE_CREATE: &str = "database_create";
pub const EVENT_DATABASE_DELETE: &str = "database_delete";
pub const EVENT_COLLECTION_CREATE: &str = "collection_create";
pub const EVENT_COLLECTION_READ: &str = "collection_read";
pub const EVENT_COLLECTION_LIST: &str = "collection_list";
pub const EVENT_COLLECTION_DELETE: &str = "collection_delete";
pub const EVENT_ATTRIBUTE_CREATE: &str = "attribute_create";
pub const EVENT_ATTRIBUTE_UPDATE: &str = "attribute_update";
pub const EVENT_ATTRIBUTE_DELETE: &str = "attribute_delete";
pub const EVENT_INDEX_CREATE: &str = "index_create";
pub const EVENT_INDEX_RENAME: &str = "index_rename";
pub const EVENT_INDEX_DELETE: &str = "index_delete";
pub const EVENT_DOCUMENT_CREATE: &str = "document_create";
pub const EVENT_DOCUMENT_READ: &str = "document_read";
pub const EVENT_DOCUMENT_UPDATE: &str = "document_update";
pub const EVENT_DOCUMENT_DELETE: &str = "document_delete";
pub const EVENT_DOCUMENT_FIND: &str = "document_find";
pub const EVENT_DOCUMENT_COUNT: &str = "document_count";
pub const EVENT_DOCUMENT_SUM: &str = "document_sum";
pub const EVENT_DOCUMENT_INCREASE: &str = "document_increase";
pub const EVENT_DOCUMENT_DECREASE: &str = "document_decrease";

type Listener = Arc<dyn Fn(&str, &Value) + Send + Sync>;

// =============================================================================
// Database
// =============================================================================

/// The document database façade over a pluggable adapter and cache.
pub struct Database<A: Adapter> {
    adapter: A,
    cache: Arc<dyn Cache>,
    instance_filters: RwLock<HashMap<String, Arc<dyn AttributeFilter>>>,
    listeners: RwLock<HashMap<String, Vec<(String, Listener)>>>,
    silent: AtomicBool,
    relationship_depth: AtomicUsize,
}

impl<A: Adapter> Database<A> {
    /// Create a façade over an adapter and cache. Registers the built-in
    /// filters process-wide (idempotently).
    pub fn new(adapter: A, cache: Arc<dyn Cache>) -> Self {
        ensure_builtin_filters();
        Self {
            adapter,
            cache,
            instance_filters: RwLock::new(HashMap::new()),
            listeners: RwLock::new(HashMap::new()),
            silent: AtomicBool::new(false),
            relationship_depth: AtomicUsize::new(0),
        }
    }

    /// The underlying adapter.
    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    // -------------------------------------------------------------------------
    // Scoping
    // -------------------------------------------------------------------------

    pub fn set_namespace(&self, namespace: &str) -> Result<()> {
        self.adapter.set_namespace(namespace)
    }

    pub fn namespace(&self) -> String {
        self.adapter.namespace()
    }

    pub fn set_default_database(&self, database: &str) -> Result<()> {
        self.adapter.set_default_database(database)
    }

    pub fn default_database(&self) -> String {
        self.adapter.default_database()
    }

    /// Check the backend is reachable.
    pub fn ping(&self) -> Result<()> {
        self.adapter.ping()
    }

    // -------------------------------------------------------------------------
    // Database lifecycle
    // -------------------------------------------------------------------------

    /// Provision the backend database and the metadata catalog collection.
    pub fn create(&self) -> Result<()> {
        let name = self.adapter.default_database();
        self.adapter.create(&name)?;
        self.adapter
            .create_collection(METADATA, &metadata_attributes(), &[])?;
        tracing::info!("created database '{}'", name);
        self.trigger(EVENT_DATABASE_CREATE, Value::String(name));
        Ok(())
    }

    /// Whether the default database (or a collection in it) exists.
    pub fn exists(&self, collection: Option<&str>) -> Result<bool> {
        self.adapter
            .exists(&self.adapter.default_database(), collection)
    }

    /// Drop the default database and purge every cache entry under this
    /// namespace.
    pub fn delete(&self) -> Result<()> {
        let name = self.adapter.default_database();
        self.adapter.delete(&name)?;
        self.cache
            .purge(&format!("cache-{}:*", self.adapter.namespace()));
        tracing::info!("deleted database '{}'", name);
        self.trigger(EVENT_DATABASE_DELETE, Value::String(name));
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Filters
    // -------------------------------------------------------------------------

    /// Register an instance-scoped filter, shadowing any process-wide filter
    /// with the same name.
    pub fn add_filter(&self, name: impl Into<String>, filter: Arc<dyn AttributeFilter>) {
        self.instance_filters.write().insert(name.into(), filter);
    }

    /// Resolve a filter by name: instance registrations shadow process-wide
    /// ones. A missing filter is a fatal configuration error.
    pub(crate) fn resolve_filter(&self, name: &str) -> Result<Arc<dyn AttributeFilter>> {
        if let Some(filter) = self.instance_filters.read().get(name) {
            return Ok(filter.clone());
        }
        shared_filter(name).ok_or_else(|| TrellisError::FilterNotFound(name.to_string()))
    }

    // -------------------------------------------------------------------------
    // Events
    // -------------------------------------------------------------------------

    /// Attach a named listener to an event channel (or `EVENT_ALL`).
    pub fn on(
        &self,
        event: impl Into<String>,
        name: impl Into<String>,
        listener: impl Fn(&str, &Value) + Send + Sync + 'static,
    ) {
        self.listeners
            .write()
            .entry(event.into())
            .or_default()
            .push((name.into(), Arc::new(listener)));
    }

    /// Detach a named listener from an event channel.
    pub fn remove_listener(&self, event: &str, name: &str) {
        if let Some(listeners) = self.listeners.write().get_mut(event) {
            listeners.retain(|(n, _)| n != name);
        }
    }

    /// Run `f` with event emission suppressed, restoring the prior state on
    /// every exit path.
    pub fn silent<T>(&self, f: impl FnOnce() -> T) -> T {
        let prior = self.silent.swap(true, Ordering::SeqCst);
        let _guard = SilentGuard {
            flag: &self.silent,
            prior,
        };
        f()
    }

    /// Fan an event out to `EVENT_ALL` listeners, then same-name listeners.
    /// No-op inside a silent scope.
    pub(crate) fn trigger(&self, event: &str, payload: Value) {
        if self.silent.load(Ordering::SeqCst) {
            return;
        }
        let listeners = self.listeners.read();
        for channel in [EVENT_ALL, event] {
            if let Some(entries) = listeners.get(channel) {
                for (_, listener) in entries {
                    listener(event, &payload);
                }
            }
        }
    }

    // -------------------------------------------------------------------------
    // Cache keys
    // -------------------------------------------------------------------------

    /// The cache key for one document under one selection fingerprint.
    pub(crate) fn cache_key(&self, collection: &str, id: &str, selections: &[String]) -> String {
        let fingerprint = if selections.is_empty() {
            "*".to_string()
        } else {
            utils::selection_fingerprint(selections)
        };
        format!(
            "cache-{}:{}:{}:{}",
            self.adapter.namespace(),
            collection,
            id,
            fingerprint
        )
    }

    /// Drop every cached selection of one document.
    pub fn purge_cached_document(&self, collection: &str, id: &str) -> bool {
        self.cache.purge(&format!(
            "cache-{}:{}:{}:*",
            self.adapter.namespace(),
            collection,
            id
        ))
    }

    /// Drop every cached document of one collection.
    pub fn purge_cached_collection(&self, collection: &str) -> bool {
        self.cache
            .purge(&format!("cache-{}:{}:*", self.adapter.namespace(), collection))
    }

    pub(crate) fn cache(&self) -> &dyn Cache {
        self.cache.as_ref()
    }

    pub(crate) fn relationship_depth(&self) -> &AtomicUsize {
        &self.relationship_depth
    }

    // -------------------------------------------------------------------------
    // Catalog access
    // -------------------------------------------------------------------------

    /// Load a collection's metadata document. The catalog's own descriptor
    /// is served from memory; everything else reads through the document
    /// engine with the gate skipped and events silenced.
    pub fn get_collection(&self, id: &str) -> Result<Document> {
        let collection = self.load_collection(id)?;
        if !collection.is_empty() && id != METADATA {
            self.trigger(EVENT_COLLECTION_READ, collection.to_value());
        }
        Ok(collection)
    }

    /// `get_collection` without the read event, for internal schema and
    /// document flows.
    pub(crate) fn load_collection(&self, id: &str) -> Result<Document> {
        if id == METADATA {
            return Ok(metadata_collection());
        }
        Authorization::skip(|| self.silent(|| self.get_document(METADATA, id, Vec::new())))
    }
}

struct SilentGuard<'a> {
    flag: &'a AtomicBool,
    prior: bool,
}

impl Drop for SilentGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(self.prior, Ordering::SeqCst);
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use trellis_storage::{MemoryAdapter, MemoryCache};

    fn database() -> Database<MemoryAdapter> {
        Database::new(MemoryAdapter::new(), Arc::new(MemoryCache::new()))
    }

    #[test]
    fn test_cache_key_shape() {
        let db = database();
        assert_eq!(db.cache_key("books", "b1", &[]), "cache-default:books:b1:*");

        let selected = db.cache_key("books", "b1", &["title".to_string()]);
        assert!(selected.starts_with("cache-default:books:b1:"));
        assert!(!selected.ends_with(":*"));
    }

    #[test]
    fn test_events_fan_out() {
        let db = database();
        static HITS: AtomicUsize = AtomicUsize::new(0);

        db.on(EVENT_ALL, "counter", |_, _| {
            HITS.fetch_add(1, Ordering::SeqCst);
        });
        db.on(EVENT_DOCUMENT_CREATE, "counter", |event, _| {
            assert_eq!(event, EVENT_DOCUMENT_CREATE);
            HITS.fetch_add(10, Ordering::SeqCst);
        });

        db.trigger(EVENT_DOCUMENT_CREATE, Value::Null);
        assert_eq!(HITS.load(Ordering::SeqCst), 11);

        db.trigger(EVENT_DOCUMENT_DELETE, Value::Null);
        assert_eq!(HITS.load(Ordering::SeqCst), 12);
    }

    #[test]
    fn test_silent_suppresses_and_restores() {
        let db = database();
        let hits = Arc::new(AtomicUsize::new(0));
        let observed = hits.clone();
        db.on(EVENT_ALL, "counter", move |_, _| {
            observed.fetch_add(1, Ordering::SeqCst);
        });

        db.silent(|| {
            db.trigger(EVENT_DOCUMENT_CREATE, Value::Null);
            db.silent(|| db.trigger(EVENT_DOCUMENT_UPDATE, Value::Null));
            db.trigger(EVENT_DOCUMENT_DELETE, Value::Null);
        });
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        db.trigger(EVENT_DOCUMENT_CREATE, Value::Null);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_remove_listener() {
        let db = database();
        let hits = Arc::new(AtomicUsize::new(0));
        let observed = hits.clone();
        db.on(EVENT_DOCUMENT_CREATE, "once", move |_, _| {
            observed.fetch_add(1, Ordering::SeqCst);
        });

        db.trigger(EVENT_DOCUMENT_CREATE, Value::Null);
        db.remove_listener(EVENT_DOCUMENT_CREATE, "once");
        db.trigger(EVENT_DOCUMENT_CREATE, Value::Null);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_metadata_collection_shortcut() {
        // no create() has run, so any adapter access would fail
        let db = database();
        let collection = db.get_collection(METADATA).unwrap();
        assert_eq!(collection.id(), METADATA);
    }

    #[test]
    fn test_instance_filter_shadows_shared() {
        use crate::filter::{FnFilter, FILTER_JSON};

        let db = database();
        db.add_filter(
            FILTER_JSON,
            Arc::new(FnFilter::new(
                |_, _| Ok(Value::String("shadowed".into())),
                |v, _| Ok(v),
            )),
        );

        let filter = db.resolve_filter(FILTER_JSON).unwrap();
        let out = filter.encode(Value::Int(1), &Document::new()).unwrap();
        assert_eq!(out, Value::String("shadowed".into()));

        assert!(db.resolve_filter("does-not-exist").is_err());
    }
}
