//! Trellis Common - Shared Types and Utilities
//!
//! Foundational types, error handling, and utilities used across the
//! Trellis database façade. Provides the document value model, schema
//! descriptors, query collaborator, and identifier/timestamp helpers that
//! the core and the storage adapters both consume.
//!
//! Key Features:
//! - Unified error type with contract-kind classification
//! - Document value object with ordered attributes and permission sets
//! - Attribute/index/relationship descriptors with canonical names
//! - Query grouping, canonical timestamps, id generation, hashing
//!
//! @version 0.1.0
//! @author Trellis Development Team

pub mod datetime;
pub mod error;
pub mod id;
pub mod permission;
pub mod query;
pub mod schema;
pub mod types;
pub mod utils;

pub use error::{ErrorKind, Result, TrellisError};
pub use id::Id;
pub use permission::{Permission, Role};
pub use query::{GroupedQueries, Query, QueryMethod};
pub use schema::{
    Attribute, AttributeType, CursorDirection, Index, IndexType, Order, RelationOptions,
    RelationType, Side, LENGTH_KEY, METADATA, ON_ACTION_CASCADE, ON_ACTION_RESTRICT,
    ON_ACTION_SET_NULL,
};
pub use types::{Document, SetMode, Value};
