//! Trellis Schema - Collection Descriptors
//!
//! Attribute, index, and relationship descriptors as stored in the metadata
//! catalog, plus the canonical type vocabulary shared with storage adapters.
//! Serialized names are part of the on-disk contract and must not change.
//!
//! @version 0.1.0
//! @author Trellis Development Team

use crate::error::{Result, TrellisError};
use crate::types::Value;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of the metadata catalog collection.
pub const METADATA: &str = "_metadata";

/// Maximum length of a collection, attribute, or index key.
pub const LENGTH_KEY: usize = 255;

/// Relationship mutation actions carried in relation options.
pub const ON_ACTION_CASCADE: &str = "cascade";
pub const ON_ACTION_RESTRICT: &str = "restrict";
pub const ON_ACTION_SET_NULL: &str = "setNull";

// =============================================================================
// Attribute Type
// =============================================================================

/// The primitive type of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    String,
    Integer,
    Double,
    Boolean,
    Datetime,
    Relationship,
}

impl AttributeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Double => "double",
            Self::Boolean => "boolean",
            Self::Datetime => "datetime",
            Self::Relationship => "relationship",
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AttributeType {
    type Err = TrellisError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "string" => Ok(Self::String),
            "integer" => Ok(Self::Integer),
            "double" => Ok(Self::Double),
            "boolean" => Ok(Self::Boolean),
            "datetime" => Ok(Self::Datetime),
            "relationship" => Ok(Self::Relationship),
            other => Err(TrellisError::UnknownType(other.to_string())),
        }
    }
}

// =============================================================================
// Index Type
// =============================================================================

/// The kind of lookup structure an index declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexType {
    Key,
    Fulltext,
    Unique,
    Spatial,
    Array,
}

impl IndexType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Key => "key",
            Self::Fulltext => "fulltext",
            Self::Unique => "unique",
            Self::Spatial => "spatial",
            Self::Array => "array",
        }
    }
}

impl fmt::Display for IndexType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for IndexType {
    type Err = TrellisError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "key" => Ok(Self::Key),
            "fulltext" => Ok(Self::Fulltext),
            "unique" => Ok(Self::Unique),
            "spatial" => Ok(Self::Spatial),
            "array" => Ok(Self::Array),
            other => Err(TrellisError::UnsupportedIndex(other.to_string())),
        }
    }
}

// =============================================================================
// Relation Type
// =============================================================================

/// The cardinality of a relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationType {
    #[serde(rename = "oneToOne")]
    OneToOne,
    #[serde(rename = "oneToMany")]
    OneToMany,
    #[serde(rename = "manyToOne")]
    ManyToOne,
    #[serde(rename = "manyToMany")]
    ManyToMany,
}

impl RelationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneToOne => "oneToOne",
            Self::OneToMany => "oneToMany",
            Self::ManyToOne => "manyToOne",
            Self::ManyToMany => "manyToMany",
        }
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which end of a relationship an attribute sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Parent,
    Child,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parent => "parent",
            Self::Child => "child",
        }
    }
}

// =============================================================================
// Order / Cursor
// =============================================================================

/// Sort direction for find operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Order {
    #[serde(rename = "ASC")]
    Asc,
    #[serde(rename = "DESC")]
    Desc,
}

impl Order {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Which side of the cursor a page is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CursorDirection {
    Before,
    #[default]
    After,
}

impl CursorDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Before => "before",
            Self::After => "after",
        }
    }
}

// =============================================================================
// Relation Options
// =============================================================================

/// Extra descriptor fields carried by relationship attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationOptions {
    #[serde(rename = "relatedCollection")]
    pub related_collection: String,
    #[serde(rename = "relationType")]
    pub relation_type: RelationType,
    #[serde(rename = "twoWay")]
    pub two_way: bool,
    #[serde(rename = "twoWayId")]
    pub two_way_id: String,
    #[serde(rename = "onUpdate", default = "default_on_action")]
    pub on_update: String,
    #[serde(rename = "onDelete", default = "default_on_action")]
    pub on_delete: String,
    pub side: Side,
}

fn default_on_action() -> String {
    ON_ACTION_RESTRICT.to_string()
}

// =============================================================================
// Attribute
// =============================================================================

fn default_signed() -> bool {
    true
}

/// Descriptor for a single collection attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: AttributeType,
    #[serde(default)]
    pub size: usize,
    #[serde(default)]
    pub required: bool,
    #[serde(default = "default_signed")]
    pub signed: bool,
    #[serde(default)]
    pub array: bool,
    #[serde(default)]
    pub default: Value,
    #[serde(default)]
    pub format: String,
    #[serde(default, rename = "formatOptions")]
    pub format_options: Value,
    #[serde(default)]
    pub filters: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<RelationOptions>,
}

impl Attribute {
    /// A plain attribute of the given type and size.
    pub fn new(id: impl Into<String>, kind: AttributeType, size: usize) -> Self {
        Self {
            id: id.into(),
            kind,
            size,
            required: false,
            signed: true,
            array: false,
            default: Value::Null,
            format: String::new(),
            format_options: Value::Null,
            filters: Vec::new(),
            options: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn array(mut self) -> Self {
        self.array = true;
        self
    }

    pub fn unsigned(mut self) -> Self {
        self.signed = false;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = value.into();
        self
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    pub fn filters(mut self, filters: Vec<&str>) -> Self {
        self.filters = filters.into_iter().map(str::to_string).collect();
        self
    }

    /// Parse a descriptor out of a metadata `Value`.
    pub fn from_value(value: &Value) -> Result<Self> {
        serde_json::from_value(value.to_json())
            .map_err(|e| TrellisError::Serialization(format!("attribute descriptor: {}", e)))
    }

    /// Serialize this descriptor into a metadata `Value`.
    pub fn to_value(&self) -> Value {
        Value::from_json(serde_json::to_value(self).unwrap_or(serde_json::Value::Null))
    }
}

// =============================================================================
// Index
// =============================================================================

/// Descriptor for a single collection index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Index {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: IndexType,
    pub attributes: Vec<String>,
    #[serde(default)]
    pub lengths: Vec<Option<usize>>,
    #[serde(default)]
    pub orders: Vec<Option<Order>>,
}

impl Index {
    pub fn new(id: impl Into<String>, kind: IndexType, attributes: Vec<&str>) -> Self {
        Self {
            id: id.into(),
            kind,
            attributes: attributes.into_iter().map(str::to_string).collect(),
            lengths: Vec::new(),
            orders: Vec::new(),
        }
    }

    /// Parse a descriptor out of a metadata `Value`.
    pub fn from_value(value: &Value) -> Result<Self> {
        serde_json::from_value(value.to_json())
            .map_err(|e| TrellisError::Serialization(format!("index descriptor: {}", e)))
    }

    /// Serialize this descriptor into a metadata `Value`.
    pub fn to_value(&self) -> Value {
        Value::from_json(serde_json::to_value(self).unwrap_or(serde_json::Value::Null))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names_are_literal() {
        assert_eq!(AttributeType::String.as_str(), "string");
        assert_eq!(AttributeType::Double.as_str(), "double");
        assert_eq!(AttributeType::Datetime.as_str(), "datetime");
        assert_eq!(IndexType::Fulltext.as_str(), "fulltext");
        assert_eq!(RelationType::ManyToMany.as_str(), "manyToMany");
        assert_eq!(Order::Asc.as_str(), "ASC");
        assert_eq!(CursorDirection::Before.as_str(), "before");
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let err = "blob".parse::<AttributeType>().unwrap_err();
        assert_eq!(err.code(), "unknown_type");
    }

    #[test]
    fn test_attribute_value_round_trip() {
        let attr = Attribute::new("title", AttributeType::String, 128)
            .required()
            .filters(vec!["json"]);
        let value = attr.to_value();
        assert_eq!(Attribute::from_value(&value).unwrap(), attr);

        // serialized names are part of the contract
        let obj = value.as_object().unwrap();
        assert!(obj.contains_key("$id"));
        assert_eq!(obj.get("type").unwrap().as_str(), Some("string"));
    }

    #[test]
    fn test_relationship_attribute_round_trip() {
        let mut attr = Attribute::new("author", AttributeType::Relationship, 0);
        attr.options = Some(RelationOptions {
            related_collection: "authors".into(),
            relation_type: RelationType::ManyToOne,
            two_way: true,
            two_way_id: "books".into(),
            on_update: ON_ACTION_RESTRICT.into(),
            on_delete: ON_ACTION_RESTRICT.into(),
            side: Side::Parent,
        });
        let value = attr.to_value();
        let parsed = Attribute::from_value(&value).unwrap();
        assert_eq!(parsed, attr);

        let opts = value
            .as_object()
            .unwrap()
            .get("options")
            .and_then(|v| v.as_object())
            .unwrap();
        assert_eq!(
            opts.get("relationType").unwrap().as_str(),
            Some("manyToOne")
        );
        assert_eq!(opts.get("side").unwrap().as_str(), Some("parent"));
    }

    #[test]
    fn test_index_value_round_trip() {
        let mut index = Index::new("by_title", IndexType::Unique, vec!["title"]);
        index.lengths = vec![Some(64)];
        index.orders = vec![Some(Order::Desc)];
        let value = index.to_value();
        assert_eq!(Index::from_value(&value).unwrap(), index);
    }
}
