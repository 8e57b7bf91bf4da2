//! Points, hits, and payload filters shared by every backend

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::embeddings::Embedding;

/// Arbitrary JSON metadata attached to a point
pub type Payload = Map<String, Value>;

/// One record: identifier + vector + payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Point {
    pub id: String,
    pub vector: Embedding,
    pub payload: Payload,
}

/// A search hit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredPoint {
    pub id: String,
    pub score: f32,
    pub payload: Payload,
}

/// A point fetched without scoring (scroll)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PointRecord {
    pub id: String,
    pub payload: Payload,
}

/// What the backend reports about a collection
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CollectionInfo {
    pub name: String,
    pub vector_size: Option<usize>,
    pub points_count: Option<u64>,
}

/// A single payload condition
#[derive(Debug, Clone, PartialEq)]
pub enum FieldCondition {
    /// Field equals value (for array fields: any element equals value)
    Equals { key: String, value: Value },
    /// Field equals one of the values (for array fields: any element does)
    AnyOf { key: String, values: Vec<Value> },
}

impl FieldCondition {
    fn key(&self) -> &str {
        match self {
            Self::Equals { key, .. } | Self::AnyOf { key, .. } => key,
        }
    }

    fn matches(&self, payload: &Payload) -> bool {
        let Some(field) = payload.get(self.key()) else {
            return false;
        };

        let candidates: Vec<&Value> = match field {
            Value::Array(items) => items.iter().collect(),
            other => vec![other],
        };

        match self {
            Self::Equals { value, .. } => candidates.iter().any(|c| *c == value),
            Self::AnyOf { values, .. } => candidates.iter().any(|c| values.contains(c)),
        }
    }

    fn to_qdrant(&self) -> Value {
        match self {
            Self::Equals { key, value } => json!({ "key": key, "match": { "value": value } }),
            Self::AnyOf { key, values } => json!({ "key": key, "match": { "any": values } }),
        }
    }
}

/// Conjunction of payload conditions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PayloadFilter {
    pub must: Vec<FieldCondition>,
}

impl PayloadFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `key == value`
    pub fn equals(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.must.push(FieldCondition::Equals {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    /// Require `key` to match any of `values`; an empty list adds nothing
    pub fn any_of<V: Into<Value>>(mut self, key: impl Into<String>, values: Vec<V>) -> Self {
        if values.is_empty() {
            return self;
        }
        self.must.push(FieldCondition::AnyOf {
            key: key.into(),
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.must.is_empty()
    }

    /// Evaluate against a payload the way Qdrant would
    pub fn matches(&self, payload: &Payload) -> bool {
        self.must.iter().all(|c| c.matches(payload))
    }

    /// Qdrant REST filter body
    pub fn to_qdrant(&self) -> Value {
        json!({ "must": self.must.iter().map(FieldCondition::to_qdrant).collect::<Vec<_>>() })
    }
}

/// Similarity search parameters
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub vector: Embedding,
    pub filter: Option<PayloadFilter>,
    pub limit: usize,
    pub min_score: Option<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(value: Value) -> Payload {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_equals_on_scalar_and_array_fields() {
        let p = payload(json!({"language": "python", "tags": ["cli", "io"]}));

        assert!(PayloadFilter::new().equals("language", "python").matches(&p));
        assert!(!PayloadFilter::new().equals("language", "rust").matches(&p));
        assert!(PayloadFilter::new().equals("tags", "io").matches(&p));
        assert!(!PayloadFilter::new().equals("missing", "x").matches(&p));
    }

    #[test]
    fn test_any_of_and_conjunction() {
        let p = payload(json!({"kind": "snippet", "tags": ["async", "tokio"]}));

        let filter = PayloadFilter::new()
            .equals("kind", "snippet")
            .any_of("tags", vec!["tokio", "rayon"]);
        assert!(filter.matches(&p));

        let filter = PayloadFilter::new()
            .equals("kind", "dependency")
            .any_of("tags", vec!["tokio"]);
        assert!(!filter.matches(&p));
    }

    #[test]
    fn test_empty_any_of_is_ignored() {
        let filter = PayloadFilter::new().any_of::<String>("tags", vec![]);
        assert!(filter.is_empty());
    }

    #[test]
    fn test_qdrant_filter_shape() {
        let filter = PayloadFilter::new()
            .equals("kind", "snippet")
            .any_of("tags", vec!["a", "b"]);

        assert_eq!(
            filter.to_qdrant(),
            json!({
                "must": [
                    {"key": "kind", "match": {"value": "snippet"}},
                    {"key": "tags", "match": {"any": ["a", "b"]}}
                ]
            })
        );
    }
}
