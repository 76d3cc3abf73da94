//! Trellis Types - Core Data Types
//!
//! The document value model shared by the core façade and storage adapters.
//! A `Document` is an ordered mapping of attribute name to `Value`, with
//! reserved `$`-prefixed system fields for identity, collection membership,
//! timestamps, and the permission set.
//!
//! Key Features:
//! - JSON-compatible value representation with ordered objects
//! - Document value object with system-field accessors
//! - Append/assign attribute set modes
//! - Serialization support via serde
//!
//! @version 0.1.0
//! @author Trellis Development Team

use crate::permission::Permission;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

// =============================================================================
// System Fields
// =============================================================================

/// Document identifier field.
pub const FIELD_ID: &str = "$id";
/// Backend-assigned internal identifier field.
pub const FIELD_INTERNAL_ID: &str = "$internalId";
/// Owning collection field.
pub const FIELD_COLLECTION: &str = "$collection";
/// Creation timestamp field.
pub const FIELD_CREATED_AT: &str = "$createdAt";
/// Last-update timestamp field.
pub const FIELD_UPDATED_AT: &str = "$updatedAt";
/// Permission set field.
pub const FIELD_PERMISSIONS: &str = "$permissions";

/// Every reserved system field carried by a document.
pub const SYSTEM_FIELDS: &[&str] = &[
    FIELD_ID,
    FIELD_INTERNAL_ID,
    FIELD_COLLECTION,
    FIELD_CREATED_AT,
    FIELD_UPDATED_AT,
    FIELD_PERMISSIONS,
];

// =============================================================================
// Value
// =============================================================================

/// A document value that can be any JSON-compatible type.
///
/// Objects are ordered so that serialized forms are canonical.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Self::Bool(_))
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Float(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Self::String(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Self::Array(_))
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Self::Object(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::Float(f) => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Self::Array(arr) => Some(arr),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Self::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Convert from serde_json::Value.
    pub fn from_json(json: JsonValue) -> Self {
        match json {
            JsonValue::Null => Self::Null,
            JsonValue::Bool(b) => Self::Bool(b),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else if let Some(f) = n.as_f64() {
                    Self::Float(f)
                } else {
                    Self::Float(0.0)
                }
            }
            JsonValue::String(s) => Self::String(s),
            JsonValue::Array(arr) => Self::Array(arr.into_iter().map(Self::from_json).collect()),
            JsonValue::Object(obj) => {
                Self::Object(obj.into_iter().map(|(k, v)| (k, Self::from_json(v))).collect())
            }
        }
    }

    /// Convert to serde_json::Value.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Null => JsonValue::Null,
            Self::Bool(b) => JsonValue::Bool(*b),
            Self::Int(n) => JsonValue::Number((*n).into()),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Self::String(s) => JsonValue::String(s.clone()),
            Self::Array(arr) => JsonValue::Array(arr.iter().map(|v| v.to_json()).collect()),
            Self::Object(obj) => JsonValue::Object(
                obj.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Int(n as i64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Self::Int(n as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<Vec<Value>> for Value {
    fn from(arr: Vec<Value>) -> Self {
        Self::Array(arr)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(obj: BTreeMap<String, Value>) -> Self {
        Self::Object(obj)
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        Self::Object(doc.into_map())
    }
}

// =============================================================================
// Set Mode
// =============================================================================

/// How `Document::set_attribute` combines a new value with an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SetMode {
    /// Replace the current value.
    #[default]
    Assign,
    /// Push onto the current array value (coercing a scalar into an array).
    Append,
}

// =============================================================================
// Document
// =============================================================================

/// A single record: user attributes plus reserved system fields.
///
/// Documents are value-typed; mutation produces a new logical version and
/// snapshots are cheap to clone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    data: BTreeMap<String, Value>,
}

impl Document {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a document from an attribute map.
    pub fn from_map(data: BTreeMap<String, Value>) -> Self {
        Self { data }
    }

    /// Create a document from an object `Value`. Returns an empty document
    /// for any other value shape.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self { data: map },
            _ => Self::default(),
        }
    }

    /// The document identifier, or `""` when unset.
    pub fn id(&self) -> &str {
        self.get_str(FIELD_ID)
    }

    /// The backend-assigned internal identifier, or `""` when unset.
    pub fn internal_id(&self) -> &str {
        self.get_str(FIELD_INTERNAL_ID)
    }

    /// The owning collection identifier, or `""` when unset.
    pub fn collection(&self) -> &str {
        self.get_str(FIELD_COLLECTION)
    }

    /// The creation timestamp, or `""` when unset.
    pub fn created_at(&self) -> &str {
        self.get_str(FIELD_CREATED_AT)
    }

    /// The last-update timestamp, or `""` when unset.
    pub fn updated_at(&self) -> &str {
        self.get_str(FIELD_UPDATED_AT)
    }

    fn get_str(&self, key: &str) -> &str {
        self.data.get(key).and_then(|v| v.as_str()).unwrap_or("")
    }

    /// Get an attribute value.
    pub fn get_attribute(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Get an attribute value, cloned, with `Null` for missing attributes.
    pub fn attribute(&self, key: &str) -> Value {
        self.data.get(key).cloned().unwrap_or(Value::Null)
    }

    /// Set an attribute value, replacing any current value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.set_attribute(key, value, SetMode::Assign)
    }

    /// Set an attribute value with an explicit set mode.
    pub fn set_attribute(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
        mode: SetMode,
    ) -> &mut Self {
        let key = key.into();
        let value = value.into();
        match mode {
            SetMode::Assign => {
                self.data.insert(key, value);
            }
            SetMode::Append => match self.data.get_mut(&key) {
                Some(Value::Array(arr)) => arr.push(value),
                Some(current) => {
                    let prior = std::mem::take(current);
                    *current = Value::Array(vec![prior, value]);
                }
                None => {
                    self.data.insert(key, Value::Array(vec![value]));
                }
            },
        }
        self
    }

    /// Remove an attribute, returning its prior value.
    pub fn remove_attribute(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    /// Whether an attribute is present.
    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// All attribute names, in order.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.data.keys()
    }

    /// The number of attributes, system fields included.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the document carries no attributes at all.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// A copy of the underlying attribute map.
    pub fn get_array_copy(&self) -> BTreeMap<String, Value> {
        self.data.clone()
    }

    /// Consume the document into its underlying attribute map.
    pub fn into_map(self) -> BTreeMap<String, Value> {
        self.data
    }

    /// The document as an object `Value`.
    pub fn to_value(&self) -> Value {
        Value::Object(self.data.clone())
    }

    // -------------------------------------------------------------------------
    // Permissions
    // -------------------------------------------------------------------------

    /// The raw permission strings carried by this document.
    pub fn permissions(&self) -> Vec<String> {
        match self.data.get(FIELD_PERMISSIONS) {
            Some(Value::Array(arr)) => arr
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }

    fn roles_for(&self, action: &str) -> Vec<String> {
        self.permissions()
            .iter()
            .filter_map(|p| Permission::parse(p))
            .filter(|(a, _)| a == action)
            .map(|(_, role)| role)
            .collect()
    }

    /// Role tokens permitted to read this document.
    pub fn get_read(&self) -> Vec<String> {
        self.roles_for("read")
    }

    /// Role tokens permitted to create this document.
    pub fn get_create(&self) -> Vec<String> {
        self.roles_for("create")
    }

    /// Role tokens permitted to update this document.
    pub fn get_update(&self) -> Vec<String> {
        self.roles_for("update")
    }

    /// Role tokens permitted to delete this document.
    pub fn get_delete(&self) -> Vec<String> {
        self.roles_for("delete")
    }

    /// Role tokens carrying the aggregate write permission
    /// (create, update, or delete).
    pub fn get_write(&self) -> Vec<String> {
        let mut roles = self.get_create();
        roles.extend(self.get_update());
        roles.extend(self.get_delete());
        roles.sort();
        roles.dedup();
        roles
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Document {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            data: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::Role;

    #[test]
    fn test_value_types() {
        assert!(Value::Null.is_null());
        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert_eq!(Value::Int(42).as_i64(), Some(42));
        assert_eq!(Value::Float(1.5).as_f64(), Some(1.5));
        assert_eq!(Value::String("hi".into()).as_str(), Some("hi"));
    }

    #[test]
    fn test_value_json_round_trip() {
        let json = serde_json::json!({"a": 1, "b": [true, null], "c": {"d": "x"}});
        let value = Value::from_json(json.clone());
        assert_eq!(value.to_json(), json);
    }

    #[test]
    fn test_document_system_fields() {
        let mut doc = Document::new();
        doc.set(FIELD_ID, "d1");
        doc.set(FIELD_COLLECTION, "books");
        assert_eq!(doc.id(), "d1");
        assert_eq!(doc.collection(), "books");
        assert_eq!(doc.internal_id(), "");
    }

    #[test]
    fn test_set_modes() {
        let mut doc = Document::new();
        doc.set("tags", Value::Array(vec!["a".into()]));
        doc.set_attribute("tags", "b", SetMode::Append);
        assert_eq!(
            doc.attribute("tags"),
            Value::Array(vec!["a".into(), "b".into()])
        );

        doc.set_attribute("name", "x", SetMode::Append);
        assert_eq!(doc.attribute("name"), Value::Array(vec!["x".into()]));

        doc.set("name", "y");
        assert_eq!(doc.attribute("name"), Value::String("y".into()));
    }

    #[test]
    fn test_document_is_empty() {
        let doc = Document::new();
        assert!(doc.is_empty());

        let mut doc = Document::new();
        doc.set("a", 1i64);
        assert!(!doc.is_empty());
    }

    #[test]
    fn test_permission_accessors() {
        let mut doc = Document::new();
        doc.set(
            FIELD_PERMISSIONS,
            Value::Array(vec![
                Permission::read(Role::any()).into(),
                Permission::update(Role::user("alice")).into(),
                Permission::delete(Role::user("alice")).into(),
            ]),
        );

        assert_eq!(doc.get_read(), vec!["any".to_string()]);
        assert_eq!(doc.get_update(), vec!["user:alice".to_string()]);
        assert!(doc.get_create().is_empty());
        assert_eq!(
            doc.get_write(),
            vec!["user:alice".to_string()]
        );
    }

    #[test]
    fn test_from_value() {
        let mut doc = Document::new();
        doc.set("title", "X");
        let value = doc.to_value();
        assert_eq!(Document::from_value(value), doc);
        assert!(Document::from_value(Value::Int(1)).is_empty());
    }
}
