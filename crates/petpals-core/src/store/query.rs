//! Query description shared by every document store.

use std::cmp::Ordering;

use serde_json::Value;

use super::StoredDocument;
use crate::error::{Error, Result};
use crate::models::RecordId;
use crate::util::is_valid_field_name;

/// Field every document carries its own key under
pub const ID_FIELD: &str = "id";

/// Sort direction of an ordered query
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

impl Direction {
    /// Orient an ascending comparison for this direction
    pub const fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Ascending => ordering,
            Self::Descending => ordering.reverse(),
        }
    }

    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

/// Single-field sort order; ties are broken by document id in the same direction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

impl OrderBy {
    pub fn new(field: impl Into<String>, direction: Direction) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    pub fn ascending(field: impl Into<String>) -> Self {
        Self::new(field, Direction::Ascending)
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self::new(field, Direction::Descending)
    }

    /// Order by document key only
    pub fn by_id() -> Self {
        Self::ascending(ID_FIELD)
    }

    /// Compare two documents in this order
    pub fn compare(&self, a: &StoredDocument, b: &StoredDocument) -> Ordering {
        let ordering = compare_values(a.value(&self.field), b.value(&self.field))
            .then_with(|| a.id.cmp(&b.id));
        self.direction.apply(ordering)
    }

    /// Position of `document` relative to `marker` in this order
    pub(crate) fn compare_to_marker(
        &self,
        document: &StoredDocument,
        marker: &CursorMarker,
    ) -> Ordering {
        let ordering = compare_values(document.value(&self.field), &marker.value)
            .then_with(|| document.id.cmp(&marker.id));
        self.direction.apply(ordering)
    }
}

impl Default for OrderBy {
    fn default() -> Self {
        Self::by_id()
    }
}

/// Server-side filter on one field
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Field equals the value exactly
    Equal { field: String, value: Value },
    /// Field is a string starting with `prefix`
    Prefix { field: String, prefix: String },
}

impl Filter {
    pub fn equal(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Equal {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn prefix(field: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self::Prefix {
            field: field.into(),
            prefix: prefix.into(),
        }
    }

    pub fn field(&self) -> &str {
        match self {
            Self::Equal { field, .. } | Self::Prefix { field, .. } => field,
        }
    }

    pub fn matches(&self, document: &StoredDocument) -> bool {
        match self {
            Self::Equal { field, value } => document.value(field) == value,
            Self::Prefix { field, prefix } => document
                .value(field)
                .as_str()
                .is_some_and(|text| text.starts_with(prefix.as_str())),
        }
    }
}

/// Opaque position of a document within one sort order.
///
/// Produced from a query result and handed back into later queries. The
/// marker remembers the field it was taken for so a store can reject it under
/// a different ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct CursorMarker {
    field: String,
    value: Value,
    id: RecordId,
}

impl CursorMarker {
    /// Take a marker for `document` under `order`
    pub fn at(document: &StoredDocument, order: &OrderBy) -> Self {
        Self {
            field: order.field.clone(),
            value: document.value(&order.field).clone(),
            id: document.id.clone(),
        }
    }

    pub(crate) fn field(&self) -> &str {
        &self.field
    }

    pub(crate) const fn value(&self) -> &Value {
        &self.value
    }

    pub(crate) const fn id(&self) -> &RecordId {
        &self.id
    }
}

/// Where a query starts relative to a marker
#[derive(Debug, Clone, PartialEq)]
pub enum StartBound {
    /// Include the marked document
    At(CursorMarker),
    /// Begin strictly after the marked document
    After(CursorMarker),
}

impl StartBound {
    pub const fn marker(&self) -> &CursorMarker {
        match self {
            Self::At(marker) | Self::After(marker) => marker,
        }
    }

    pub const fn is_inclusive(&self) -> bool {
        matches!(self, Self::At(_))
    }
}

/// Filtered, ordered, cursor-bounded read of one collection
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    collection: String,
    filters: Vec<Filter>,
    order: OrderBy,
    start: Option<StartBound>,
    end_before: Option<CursorMarker>,
    limit: Option<usize>,
}

impl Query {
    /// All documents of `collection` ordered by id
    pub fn collection(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            filters: Vec::new(),
            order: OrderBy::default(),
            start: None,
            end_before: None,
            limit: None,
        }
    }

    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    #[must_use]
    pub fn filters(mut self, filters: impl IntoIterator<Item = Filter>) -> Self {
        self.filters.extend(filters);
        self
    }

    #[must_use]
    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order = order;
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn start_at(mut self, marker: CursorMarker) -> Self {
        self.start = Some(StartBound::At(marker));
        self
    }

    #[must_use]
    pub fn start_after(mut self, marker: CursorMarker) -> Self {
        self.start = Some(StartBound::After(marker));
        self
    }

    #[must_use]
    pub fn end_before(mut self, marker: CursorMarker) -> Self {
        self.end_before = Some(marker);
        self
    }

    pub fn collection_name(&self) -> &str {
        &self.collection
    }

    pub fn filter_list(&self) -> &[Filter] {
        &self.filters
    }

    pub const fn order(&self) -> &OrderBy {
        &self.order
    }

    pub const fn start(&self) -> Option<&StartBound> {
        self.start.as_ref()
    }

    pub const fn end(&self) -> Option<&CursorMarker> {
        self.end_before.as_ref()
    }

    pub const fn limit_value(&self) -> Option<usize> {
        self.limit
    }

    /// Check field names and that every marker belongs to this ordering
    pub fn validate(&self) -> Result<()> {
        if self.collection.trim().is_empty() {
            return Err(Error::InvalidInput("collection name cannot be empty".into()));
        }

        let fields = self
            .filters
            .iter()
            .map(Filter::field)
            .chain(std::iter::once(self.order.field.as_str()));
        for field in fields {
            if !is_valid_field_name(field) {
                return Err(Error::InvalidInput(format!("invalid field name '{field}'")));
            }
        }

        let markers = self
            .start
            .iter()
            .map(StartBound::marker)
            .chain(self.end_before.iter());
        for marker in markers {
            if marker.field() != self.order.field {
                return Err(Error::InvalidCursor(format!(
                    "marker taken for '{}' used with ordering on '{}'",
                    marker.field(),
                    self.order.field
                )));
            }
        }

        Ok(())
    }

    /// Whether `document` passes the filters and cursor bounds (limit aside)
    pub(crate) fn admits(&self, document: &StoredDocument) -> bool {
        if !self.filters.iter().all(|filter| filter.matches(document)) {
            return false;
        }

        if let Some(start) = &self.start {
            let position = self.order.compare_to_marker(document, start.marker());
            let admitted = if start.is_inclusive() {
                position != Ordering::Less
            } else {
                position == Ordering::Greater
            };
            if !admitted {
                return false;
            }
        }

        self.end_before
            .as_ref()
            .is_none_or(|end| self.order.compare_to_marker(document, end) == Ordering::Less)
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over field values: null, bool, number, string, array, object.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(left), Value::Bool(right)) => left.cmp(right),
        (Value::Number(left), Value::Number(right)) => match (left.as_i64(), right.as_i64()) {
            (Some(left), Some(right)) => left.cmp(&right),
            _ => {
                let left = left.as_f64().unwrap_or(f64::NAN);
                let right = right.as_f64().unwrap_or(f64::NAN);
                left.total_cmp(&right)
            }
        },
        (Value::String(left), Value::String(right)) => left.cmp(right),
        (Value::Array(left), Value::Array(right)) => left
            .iter()
            .zip(right.iter())
            .map(|(l, r)| compare_values(l, r))
            .find(|ordering| ordering.is_ne())
            .unwrap_or_else(|| left.len().cmp(&right.len())),
        (Value::Object(left), Value::Object(right)) => left
            .iter()
            .zip(right.iter())
            .map(|((left_key, left_value), (right_key, right_value))| {
                left_key
                    .cmp(right_key)
                    .then_with(|| compare_values(left_value, right_value))
            })
            .find(|ordering| ordering.is_ne())
            .unwrap_or_else(|| left.len().cmp(&right.len())),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(id: &str, n: i64) -> StoredDocument {
        StoredDocument::from_json(id, json!({ "n": n })).unwrap()
    }

    #[test]
    fn values_order_by_type_then_content() {
        assert_eq!(compare_values(&json!(null), &json!(false)), Ordering::Less);
        assert_eq!(compare_values(&json!(true), &json!(0)), Ordering::Less);
        assert_eq!(compare_values(&json!(9), &json!("1")), Ordering::Less);
        assert_eq!(compare_values(&json!(2), &json!(10)), Ordering::Less);
        assert_eq!(compare_values(&json!(2.5), &json!(2)), Ordering::Greater);
        assert_eq!(compare_values(&json!("b"), &json!("ab")), Ordering::Greater);
    }

    #[test]
    fn objects_compare_entry_by_entry() {
        assert_eq!(
            compare_values(&json!({ "a": 1 }), &json!({ "a": 2 })),
            Ordering::Less
        );
        assert_eq!(
            compare_values(&json!({ "a": 1 }), &json!({ "b": 0 })),
            Ordering::Less
        );
        assert_eq!(
            compare_values(&json!({ "a": 1, "b": 2 }), &json!({ "a": 1 })),
            Ordering::Greater
        );
        assert_eq!(
            compare_values(&json!({ "a": [1, 2] }), &json!({ "a": [1, 2] })),
            Ordering::Equal
        );
    }

    #[test]
    fn descending_order_breaks_ties_by_descending_id() {
        let order = OrderBy::descending("n");
        assert_eq!(order.compare(&doc("a", 1), &doc("b", 2)), Ordering::Greater);
        assert_eq!(order.compare(&doc("a", 1), &doc("b", 1)), Ordering::Greater);
    }

    #[test]
    fn prefix_filter_requires_text() {
        let filter = Filter::prefix("name", "Re");
        let rex = StoredDocument::from_json("1", json!({ "name": "Rex" })).unwrap();
        let numeric = StoredDocument::from_json("2", json!({ "name": 5 })).unwrap();
        assert!(filter.matches(&rex));
        assert!(!filter.matches(&numeric));
    }

    #[test]
    fn validate_rejects_marker_from_other_ordering() {
        let marker = CursorMarker::at(&doc("a", 1), &OrderBy::ascending("n"));
        let query = Query::collection("things")
            .order_by(OrderBy::ascending("m"))
            .start_after(marker);
        assert!(matches!(query.validate(), Err(Error::InvalidCursor(_))));
    }

    #[test]
    fn validate_rejects_unsafe_field_names() {
        let query = Query::collection("things").filter(Filter::equal("a'b", 1));
        assert!(matches!(query.validate(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn admits_honours_start_and_end_bounds() {
        let order = OrderBy::ascending("n");
        let two = CursorMarker::at(&doc("b", 2), &order);
        let four = CursorMarker::at(&doc("d", 4), &order);

        let after = Query::collection("t")
            .order_by(order.clone())
            .start_after(two.clone())
            .end_before(four);
        assert!(!after.admits(&doc("b", 2)));
        assert!(after.admits(&doc("c", 3)));
        assert!(!after.admits(&doc("d", 4)));

        let at = Query::collection("t").order_by(order).start_at(two);
        assert!(at.admits(&doc("b", 2)));
        assert!(!at.admits(&doc("a", 1)));
    }
}
