//! Trellis Adapter - Storage Adapter Abstraction
//!
//! Defines the pluggable storage adapter trait the document engine drives.
//! An adapter owns physical persistence, index execution, and query
//! evaluation; the engine owns schema semantics, permissions, filters, and
//! caching. Adapters are synchronous from the engine's perspective.
//!
//! Key Features:
//! - Collection/attribute/index/relationship DDL operations
//! - Document CRUD with counter increments
//! - Filtered, ordered, cursor-paginated find plus count/sum
//! - Capability queries for limits and feature support
//!
//! @version 0.1.0
//! @author Trellis Development Team

use trellis_common::{
    Attribute, CursorDirection, Document, Index, Order, Query, Result,
};

// =============================================================================
// Adapter Trait
// =============================================================================

/// Pluggable storage adapter interface.
pub trait Adapter: Send + Sync {
    // -------------------------------------------------------------------------
    // Scoping
    // -------------------------------------------------------------------------

    /// Set the namespace prefix separating logical tenants.
    fn set_namespace(&self, namespace: &str) -> Result<()>;

    /// The current namespace prefix.
    fn namespace(&self) -> String;

    /// Set the default database new collections land in.
    fn set_default_database(&self, database: &str) -> Result<()>;

    /// The current default database.
    fn default_database(&self) -> String;

    /// Check the backend is reachable.
    fn ping(&self) -> Result<()>;

    // -------------------------------------------------------------------------
    // Databases
    // -------------------------------------------------------------------------

    /// Create a database.
    fn create(&self, name: &str) -> Result<()>;

    /// Delete a database and everything in it.
    fn delete(&self, name: &str) -> Result<()>;

    /// List database names.
    fn list(&self) -> Result<Vec<String>>;

    /// Check a database, or a collection within it, exists.
    fn exists(&self, database: &str, collection: Option<&str>) -> Result<bool>;

    // -------------------------------------------------------------------------
    // Collections
    // -------------------------------------------------------------------------

    /// Create a collection with its initial attributes and indexes.
    fn create_collection(
        &self,
        name: &str,
        attributes: &[Attribute],
        indexes: &[Index],
    ) -> Result<()>;

    /// Delete a collection and its documents.
    fn delete_collection(&self, name: &str) -> Result<()>;

    // -------------------------------------------------------------------------
    // Attributes
    // -------------------------------------------------------------------------

    /// Add an attribute to a collection.
    fn create_attribute(&self, collection: &str, attribute: &Attribute) -> Result<()>;

    /// Replace an attribute's structural definition.
    fn update_attribute(&self, collection: &str, attribute: &Attribute) -> Result<()>;

    /// Remove an attribute from a collection.
    fn delete_attribute(&self, collection: &str, id: &str) -> Result<()>;

    /// Rename an attribute, carrying stored values over.
    fn rename_attribute(&self, collection: &str, old: &str, new: &str) -> Result<()>;

    /// Create the backing columns for a relationship attribute.
    fn create_relationship(
        &self,
        collection: &str,
        related_collection: &str,
        attribute: &Attribute,
    ) -> Result<()>;

    // -------------------------------------------------------------------------
    // Indexes
    // -------------------------------------------------------------------------

    /// Create an index on a collection.
    fn create_index(&self, collection: &str, index: &Index) -> Result<()>;

    /// Delete an index from a collection.
    fn delete_index(&self, collection: &str, id: &str) -> Result<()>;

    /// Rename an index.
    fn rename_index(&self, collection: &str, old: &str, new: &str) -> Result<()>;

    // -------------------------------------------------------------------------
    // Documents
    // -------------------------------------------------------------------------

    /// Fetch one document by id. Returns an empty document when missing.
    fn get_document(&self, collection: &str, id: &str) -> Result<Document>;

    /// Insert a document, assigning its internal id.
    fn create_document(&self, collection: &str, document: &Document) -> Result<Document>;

    /// Replace a stored document.
    fn update_document(&self, collection: &str, document: &Document) -> Result<Document>;

    /// Remove a document.
    fn delete_document(&self, collection: &str, id: &str) -> Result<()>;

    /// Atomically add `delta` to a numeric attribute, enforcing optional
    /// bounds, and return the new value.
    fn increase_document_attribute(
        &self,
        collection: &str,
        id: &str,
        attribute: &str,
        delta: f64,
        min: Option<f64>,
        max: Option<f64>,
    ) -> Result<f64>;

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Find documents matching the filter queries.
    #[allow(clippy::too_many_arguments)]
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
    ) -> Result<Vec<Document>>;

    /// Count documents matching the filter queries. `max = 0` is unbounded.
    fn count(&self, collection: &str, queries: &[Query], max: usize) -> Result<usize>;

    /// Sum a numeric attribute over matching documents. `max = 0` is
    /// unbounded.
    fn sum(&self, collection: &str, attribute: &str, queries: &[Query], max: usize)
        -> Result<f64>;

    // -------------------------------------------------------------------------
    // Capabilities
    // -------------------------------------------------------------------------

    /// Maximum number of attributes per collection. `0` is unlimited.
    fn get_limit_for_attributes(&self) -> usize;

    /// Maximum number of indexes per collection. `0` is unlimited.
    fn get_limit_for_indexes(&self) -> usize;

    /// Maximum size of a string attribute.
    fn get_limit_for_string(&self) -> usize;

    /// Maximum magnitude of an integer attribute (halved when signed).
    fn get_limit_for_int(&self) -> usize;

    /// Attribute count for a collection document, internal columns included.
    fn get_count_of_attributes(&self, collection: &Document) -> usize;

    /// Index count for a collection document, internal indexes included.
    fn get_count_of_indexes(&self, collection: &Document) -> usize;

    /// Number of internal columns every collection carries.
    fn get_count_of_default_attributes(&self) -> usize;

    /// Number of internal indexes every collection carries.
    fn get_count_of_default_indexes(&self) -> usize;

    /// Estimated row width, in bytes, for a collection document.
    fn get_attribute_width(&self, collection: &Document) -> usize;

    /// Maximum row width, in bytes. `0` is unlimited.
    fn get_document_size_limit(&self) -> usize;

    /// Whether the adapter executes indexes at all.
    fn get_support_for_index(&self) -> bool;

    /// Whether the adapter enforces unique (and fulltext) indexes.
    fn get_support_for_unique_index(&self) -> bool;

    /// Whether the adapter casts stored values to their declared types.
    fn get_support_for_casting(&self) -> bool;

    /// Reserved words that cannot be used as collection identifiers.
    fn get_keywords(&self) -> Vec<String>;
}
