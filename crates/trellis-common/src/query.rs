//! Trellis Query - Query Collaborator
//!
//! A query is a single (method, attribute, values) triple. Callers assemble
//! lists of queries; `Query::group_by_type` splits such a list into the
//! filter, selection, pagination, ordering, and cursor parts the document
//! engine and adapters consume.
//!
//! @version 0.1.0
//! @author Trellis Development Team

use crate::schema::{CursorDirection, Order};
use crate::types::{Document, Value};
use serde::{Deserialize, Serialize};

// =============================================================================
// Query Method
// =============================================================================

/// The operation a query expresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QueryMethod {
    Equal,
    NotEqual,
    LessThan,
    LessThanEqual,
    GreaterThan,
    GreaterThanEqual,
    Contains,
    Search,
    IsNull,
    IsNotNull,
    Select,
    OrderAsc,
    OrderDesc,
    Limit,
    Offset,
    CursorAfter,
    CursorBefore,
}

impl QueryMethod {
    /// Whether this method filters rows (as opposed to shaping the result).
    pub fn is_filter(&self) -> bool {
        matches!(
            self,
            Self::Equal
                | Self::NotEqual
                | Self::LessThan
                | Self::LessThanEqual
                | Self::GreaterThan
                | Self::GreaterThanEqual
                | Self::Contains
                | Self::Search
                | Self::IsNull
                | Self::IsNotNull
        )
    }
}

// =============================================================================
// Query
// =============================================================================

/// A single query term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    method: QueryMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    attribute: Option<String>,
    #[serde(default)]
    values: Vec<Value>,
}

impl Query {
    pub fn new(method: QueryMethod, attribute: Option<String>, values: Vec<Value>) -> Self {
        Self {
            method,
            attribute,
            values,
        }
    }

    pub fn method(&self) -> QueryMethod {
        self.method
    }

    pub fn attribute(&self) -> Option<&str> {
        self.attribute.as_deref()
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// The first value, or `Null` when none is present.
    pub fn value(&self) -> Value {
        self.values.first().cloned().unwrap_or(Value::Null)
    }

    pub fn set_values(&mut self, values: Vec<Value>) {
        self.values = values;
    }

    // -------------------------------------------------------------------------
    // Filter constructors
    // -------------------------------------------------------------------------

    pub fn equal(attribute: impl Into<String>, values: Vec<Value>) -> Self {
        Self::new(QueryMethod::Equal, Some(attribute.into()), values)
    }

    pub fn not_equal(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(QueryMethod::NotEqual, Some(attribute.into()), vec![value.into()])
    }

    pub fn less_than(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(QueryMethod::LessThan, Some(attribute.into()), vec![value.into()])
    }

    pub fn less_than_equal(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(
            QueryMethod::LessThanEqual,
            Some(attribute.into()),
            vec![value.into()],
        )
    }

    pub fn greater_than(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(QueryMethod::GreaterThan, Some(attribute.into()), vec![value.into()])
    }

    pub fn greater_than_equal(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(
            QueryMethod::GreaterThanEqual,
            Some(attribute.into()),
            vec![value.into()],
        )
    }

    pub fn contains(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(QueryMethod::Contains, Some(attribute.into()), vec![value.into()])
    }

    pub fn search(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(QueryMethod::Search, Some(attribute.into()), vec![value.into()])
    }

    pub fn is_null(attribute: impl Into<String>) -> Self {
        Self::new(QueryMethod::IsNull, Some(attribute.into()), Vec::new())
    }

    pub fn is_not_null(attribute: impl Into<String>) -> Self {
        Self::new(QueryMethod::IsNotNull, Some(attribute.into()), Vec::new())
    }

    // -------------------------------------------------------------------------
    // Result-shaping constructors
    // -------------------------------------------------------------------------

    pub fn select(attributes: Vec<&str>) -> Self {
        Self::new(
            QueryMethod::Select,
            None,
            attributes.into_iter().map(Value::from).collect(),
        )
    }

    pub fn order_asc(attribute: impl Into<String>) -> Self {
        Self::new(QueryMethod::OrderAsc, Some(attribute.into()), Vec::new())
    }

    pub fn order_desc(attribute: impl Into<String>) -> Self {
        Self::new(QueryMethod::OrderDesc, Some(attribute.into()), Vec::new())
    }

    pub fn limit(limit: usize) -> Self {
        Self::new(QueryMethod::Limit, None, vec![Value::Int(limit as i64)])
    }

    pub fn offset(offset: usize) -> Self {
        Self::new(QueryMethod::Offset, None, vec![Value::Int(offset as i64)])
    }

    pub fn cursor_after(document: Document) -> Self {
        Self::new(QueryMethod::CursorAfter, None, vec![document.to_value()])
    }

    pub fn cursor_before(document: Document) -> Self {
        Self::new(QueryMethod::CursorBefore, None, vec![document.to_value()])
    }

    // -------------------------------------------------------------------------
    // Grouping
    // -------------------------------------------------------------------------

    /// Split a query list into its typed parts.
    ///
    /// Later occurrences of limit/offset/cursor win over earlier ones;
    /// selection lists accumulate.
    pub fn group_by_type(queries: &[Query]) -> GroupedQueries {
        let mut grouped = GroupedQueries::default();

        for query in queries {
            match query.method {
                QueryMethod::Select => {
                    for value in &query.values {
                        if let Some(attr) = value.as_str() {
                            grouped.selections.push(attr.to_string());
                        }
                    }
                }
                QueryMethod::OrderAsc => {
                    if let Some(attr) = query.attribute() {
                        grouped.order_attributes.push(attr.to_string());
                        grouped.order_types.push(Order::Asc);
                    }
                }
                QueryMethod::OrderDesc => {
                    if let Some(attr) = query.attribute() {
                        grouped.order_attributes.push(attr.to_string());
                        grouped.order_types.push(Order::Desc);
                    }
                }
                QueryMethod::Limit => {
                    grouped.limit = query.value().as_i64().map(|n| n.max(0) as usize);
                }
                QueryMethod::Offset => {
                    grouped.offset = query.value().as_i64().map(|n| n.max(0) as usize);
                }
                QueryMethod::CursorAfter => {
                    grouped.cursor = Some(Document::from_value(query.value()));
                    grouped.cursor_direction = Some(CursorDirection::After);
                }
                QueryMethod::CursorBefore => {
                    grouped.cursor = Some(Document::from_value(query.value()));
                    grouped.cursor_direction = Some(CursorDirection::Before);
                }
                _ => grouped.filters.push(query.clone()),
            }
        }

        grouped
    }
}

// =============================================================================
// Grouped Queries
// =============================================================================

/// The typed parts of a query list.
#[derive(Debug, Clone, Default)]
pub struct GroupedQueries {
    pub filters: Vec<Query>,
    pub selections: Vec<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub order_attributes: Vec<String>,
    pub order_types: Vec<Order>,
    pub cursor: Option<Document>,
    pub cursor_direction: Option<CursorDirection>,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FIELD_ID;

    #[test]
    fn test_constructors() {
        let q = Query::equal("title", vec!["X".into()]);
        assert_eq!(q.method(), QueryMethod::Equal);
        assert_eq!(q.attribute(), Some("title"));
        assert_eq!(q.values(), &[Value::String("X".into())]);

        let q = Query::limit(10);
        assert_eq!(q.value().as_i64(), Some(10));
    }

    #[test]
    fn test_set_values() {
        let mut q = Query::equal("count", vec![Value::Int(1)]);
        q.set_values(vec![Value::Int(2)]);
        assert_eq!(q.value(), Value::Int(2));
    }

    #[test]
    fn test_group_by_type() {
        let mut cursor = Document::new();
        cursor.set(FIELD_ID, "d9");

        let queries = vec![
            Query::equal("title", vec!["X".into()]),
            Query::select(vec!["title", "year"]),
            Query::order_desc("year"),
            Query::limit(5),
            Query::offset(10),
            Query::cursor_after(cursor),
            Query::greater_than("year", 1990i64),
        ];

        let grouped = Query::group_by_type(&queries);
        assert_eq!(grouped.filters.len(), 2);
        assert_eq!(grouped.selections, vec!["title", "year"]);
        assert_eq!(grouped.limit, Some(5));
        assert_eq!(grouped.offset, Some(10));
        assert_eq!(grouped.order_attributes, vec!["year"]);
        assert_eq!(grouped.order_types, vec![Order::Desc]);
        assert_eq!(grouped.cursor.as_ref().map(|d| d.id().to_string()), Some("d9".into()));
        assert_eq!(grouped.cursor_direction, Some(CursorDirection::After));
    }

    #[test]
    fn test_is_filter() {
        assert!(QueryMethod::Equal.is_filter());
        assert!(QueryMethod::IsNull.is_filter());
        assert!(!QueryMethod::Limit.is_filter());
        assert!(!QueryMethod::Select.is_filter());
    }
}
