//! Query, update and result types shared by every collection
//!
//! These mirror the shapes document stores expose: an equality filter,
//! skip/limit find options, `$set` updates and per-operation counts.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A schema-flexible record
pub type Document = Map<String, Value>;

/// Conjunction of field equality predicates
///
/// An empty filter matches every document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<(String, Value)>,
}

impl Filter {
    /// Match every document
    pub fn all() -> Self {
        Self::default()
    }

    /// Match documents whose `field` equals `value`
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::all().and_eq(field, value)
    }

    /// Add another equality condition
    pub fn and_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push((field.into(), value.into()));
        self
    }

    /// Check whether the filter has no conditions
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Test a document against the filter
    pub fn matches(&self, doc: &Document) -> bool {
        self.conditions
            .iter()
            .all(|(field, expected)| doc.get(field) == Some(expected))
    }
}

/// Options for `find`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindOptions {
    /// Number of matching documents to pass over
    pub skip: Option<u64>,
    /// Maximum number of documents to return (0 means no cap)
    pub limit: Option<u64>,
}

impl FindOptions {
    /// Documents to skip, defaulting to none
    pub fn skip_count(&self) -> u64 {
        self.skip.unwrap_or(0)
    }

    /// Row cap, `None` when unlimited
    pub fn row_cap(&self) -> Option<u64> {
        self.limit.filter(|limit| *limit > 0)
    }
}

/// A `$set` update
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateSpec {
    set: Document,
}

impl UpdateSpec {
    /// Set each field of `fields` on the matched document
    pub fn set(fields: Document) -> Self {
        Self { set: fields }
    }

    /// Fields written by this update
    pub fn fields(&self) -> &Document {
        &self.set
    }
}

/// Outcome of `insert_one`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertOneResult {
    /// Value of the inserted document's id field
    pub inserted_id: Value,
}

/// Outcome of `update_one`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateResult {
    /// Documents that matched the filter (0 or 1)
    pub matched_count: u64,
    /// Documents whose content actually changed (0 or 1)
    pub modified_count: u64,
}

impl UpdateResult {
    /// Whether the filter found a document to update
    pub fn target_found(&self) -> bool {
        self.matched_count > 0
    }
}

/// Outcome of `delete_one`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResult {
    /// Documents removed (0 or 1)
    pub deleted_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = Filter::all();
        assert!(filter.is_empty());
        assert!(filter.matches(&doc(json!({}))));
        assert!(filter.matches(&doc(json!({"title": "x"}))));
    }

    #[test]
    fn test_eq_filter() {
        let filter = Filter::eq("id", "abc");
        assert!(filter.matches(&doc(json!({"id": "abc", "title": "t"}))));
        assert!(!filter.matches(&doc(json!({"id": "abd"}))));
        assert!(!filter.matches(&doc(json!({"title": "abc"}))));
    }

    #[test]
    fn test_conjunction() {
        let filter = Filter::eq("a", 1).and_eq("b", true);
        assert!(filter.matches(&doc(json!({"a": 1, "b": true}))));
        assert!(!filter.matches(&doc(json!({"a": 1, "b": false}))));
    }

    #[test]
    fn test_find_options_zero_limit_is_unbounded() {
        let options = FindOptions {
            skip: None,
            limit: Some(0),
        };
        assert_eq!(options.row_cap(), None);
        assert_eq!(options.skip_count(), 0);
    }

    #[test]
    fn test_update_result_target_found() {
        assert!(!UpdateResult::default().target_found());
        let result = UpdateResult {
            matched_count: 1,
            modified_count: 0,
        };
        assert!(result.target_found());
    }
}
