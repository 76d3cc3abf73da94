//! Trellis DB - Schema-Managed Document Database Façade
//!
//! Trellis sits between an application and a pluggable storage backend and
//! owns the semantics the backend does not: a metadata catalog describing
//! collections, attributes, indexes, and relationships; a per-attribute
//! encode/decode filter pipeline; a permission-gated document CRUD surface
//! with a write-through cache; relationship traversal across collections;
//! and query normalization for typed values.
//!
//! Key Features:
//! - Self-describing `_metadata` catalog mirrored on every schema mutation
//! - Reversible attribute filter chains (forward encode, reversed decode)
//! - Ambient-identity permission gate with scoped skip/disable
//! - Selection-aware write-through document cache
//! - Relationship hydration and persistence across four cardinalities
//!
//! @version 0.1.0
//! @author Trellis Development Team

pub mod authorization;
pub mod database;
pub mod filter;
pub mod metadata;
pub mod validation;

pub use authorization::Authorization;
pub use database::{
    Database, DEFAULT_LIMIT, EVENT_ALL, EVENT_ATTRIBUTE_CREATE, EVENT_ATTRIBUTE_DELETE,
    EVENT_ATTRIBUTE_UPDATE, EVENT_COLLECTION_CREATE, EVENT_COLLECTION_DELETE,
    EVENT_COLLECTION_LIST, EVENT_COLLECTION_READ, EVENT_DATABASE_CREATE, EVENT_DATABASE_DELETE,
    EVENT_DOCUMENT_COUNT, EVENT_DOCUMENT_CREATE, EVENT_DOCUMENT_DECREASE, EVENT_DOCUMENT_DELETE,
    EVENT_DOCUMENT_FIND, EVENT_DOCUMENT_INCREASE, EVENT_DOCUMENT_READ, EVENT_DOCUMENT_SUM,
    EVENT_DOCUMENT_UPDATE, EVENT_INDEX_CREATE, EVENT_INDEX_DELETE, EVENT_INDEX_RENAME,
    RELATIONSHIP_MAX_DEPTH, TTL,
};
pub use filter::{AttributeFilter, DatetimeFilter, FnFilter, JsonFilter};
pub use metadata::{collection_attributes, collection_indexes, metadata_collection};
pub use validation::{add_format, has_format, IndexValidator, Structure};

pub use trellis_common::{
    datetime, Attribute, AttributeType, CursorDirection, Document, ErrorKind, GroupedQueries, Id,
    Index, IndexType, Order, Permission, Query, QueryMethod, RelationOptions, RelationType, Result,
    Role, SetMode, Side, TrellisError, Value, LENGTH_KEY, METADATA,
};
pub use trellis_storage::{Adapter, Cache, MemoryAdapter, MemoryCache, MemoryLimits};
