//! Query string parameters and LoopBack-style filters

use crate::core::error::{ApiError, RequestError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// Field -> expected value; every pair must match exactly
pub type Where = Map<String, Value>;

/// Query parameters accepted by every remote method
///
/// # Example
/// ```text
/// GET /api/jobs?filter={"where":{"status":"open"},"order":"title ASC","limit":10}
/// GET /api/jobs/count?where={"status":"open"}
/// GET /api/users/{id}?access_token=<token>
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct QueryParams {
    pub filter: Option<String>,

    #[serde(rename = "where")]
    pub where_clause: Option<String>,

    pub access_token: Option<String>,
}

impl QueryParams {
    /// Parsed `filter` parameter, empty when absent
    pub fn filter(&self) -> Result<Filter, ApiError> {
        match &self.filter {
            Some(raw) => Filter::from_json_str(raw),
            None => Ok(Filter::default()),
        }
    }

    /// Parsed `where` parameter
    pub fn where_clause(&self) -> Result<Option<Where>, ApiError> {
        let Some(raw) = &self.where_clause else {
            return Ok(None);
        };
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => Ok(Some(map)),
            Ok(_) => Err(bad_request("`where` must be a JSON object")),
            Err(e) => Err(bad_request(&format!("Invalid `where` parameter: {}", e))),
        }
    }
}

fn bad_request(message: &str) -> ApiError {
    RequestError::BadRequest {
        message: message.to_string(),
    }
    .into()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(default, rename = "where", skip_serializing_if = "Option::is_none")]
    pub where_clause: Option<Where>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,

    #[serde(default, alias = "offset", skip_serializing_if = "Option::is_none")]
    pub skip: Option<usize>,

    /// `field`, `field ASC` or `field DESC`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,
}

impl Filter {
    pub fn from_json_str(raw: &str) -> Result<Self, ApiError> {
        serde_json::from_str(raw).map_err(|e| bad_request(&format!("Invalid filter: {}", e)))
    }

    pub fn with_where(where_clause: Where) -> Self {
        Self {
            where_clause: Some(where_clause),
            ..Default::default()
        }
    }

    /// Add an exact-match condition, overriding any caller-supplied one
    pub fn and_equals(mut self, field: &str, value: Value) -> Self {
        self.where_clause
            .get_or_insert_with(Map::new)
            .insert(field.to_string(), value);
        self
    }

    pub fn matches(&self, document: &Value) -> bool {
        matches_where(self.where_clause.as_ref(), document)
    }

    /// Order, skip and limit already-matching documents
    pub fn paginate(&self, mut documents: Vec<Value>) -> Vec<Value> {
        if let Some(order) = &self.order {
            let mut parts = order.split_whitespace();
            let field = parts.next().unwrap_or_default().to_string();
            let descending = parts
                .next()
                .is_some_and(|dir| dir.eq_ignore_ascii_case("desc"));

            documents.sort_by(|a, b| {
                let ordering = compare_values(&a[&field], &b[&field]);
                if descending { ordering.reverse() } else { ordering }
            });
        }

        documents
            .into_iter()
            .skip(self.skip.unwrap_or(0))
            .take(self.limit.unwrap_or(usize::MAX))
            .collect()
    }
}

pub fn matches_where(where_clause: Option<&Where>, document: &Value) -> bool {
    let Some(conditions) = where_clause else {
        return true;
    };
    conditions
        .iter()
        .all(|(field, expected)| document.get(field).unwrap_or(&Value::Null) == expected)
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        _ => a.to_string().cmp(&b.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_filter() {
        let filter =
            Filter::from_json_str(r#"{"where":{"status":"open"},"limit":2,"order":"title DESC"}"#)
                .unwrap();

        assert_eq!(filter.limit, Some(2));
        assert_eq!(filter.order.as_deref(), Some("title DESC"));
        assert!(filter.matches(&json!({"status": "open", "title": "a"})));
        assert!(!filter.matches(&json!({"status": "closed"})));
    }

    #[test]
    fn test_invalid_filter_is_bad_request() {
        let err = Filter::from_json_str("{not json").unwrap_err();
        assert_eq!(err.error_code(), "BAD_REQUEST");
    }

    #[test]
    fn test_missing_field_matches_only_null() {
        let filter = Filter::with_where(json!({"jobId": null}).as_object().unwrap().clone());
        assert!(filter.matches(&json!({"title": "x"})));
        assert!(!filter.matches(&json!({"jobId": "abc"})));
    }

    #[test]
    fn test_paginate() {
        let docs = vec![
            json!({"title": "b"}),
            json!({"title": "c"}),
            json!({"title": "a"}),
        ];
        let filter = Filter {
            order: Some("title ASC".to_string()),
            skip: Some(1),
            limit: Some(1),
            ..Default::default()
        };

        assert_eq!(filter.paginate(docs), vec![json!({"title": "b"})]);
    }

    #[test]
    fn test_and_equals_overrides() {
        let filter = Filter::with_where(json!({"userId": "x"}).as_object().unwrap().clone())
            .and_equals("userId", json!("y"));
        assert!(filter.matches(&json!({"userId": "y"})));
    }

    #[test]
    fn test_where_parameter() {
        let params = QueryParams {
            where_clause: Some(r#"{"status":"open"}"#.to_string()),
            ..Default::default()
        };
        let clause = params.where_clause().unwrap().unwrap();
        assert_eq!(clause["status"], "open");

        let params = QueryParams {
            where_clause: Some("[1]".to_string()),
            ..Default::default()
        };
        assert!(params.where_clause().is_err());
    }
}
