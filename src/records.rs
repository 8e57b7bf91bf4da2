//! Stored record types
//!
//! Every record lives in the same collection; the `kind` payload field tells
//! them apart. Records are flat and only ever written whole.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::vector_store::{Payload, PayloadFilter};

/// Payload field holding the record kind
pub const KIND_FIELD: &str = "kind";

/// Discriminator stored in every payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Snippet,
    Dependency,
    CrateDocumentation,
}

impl RecordKind {
    pub const ALL: [RecordKind; 3] = [Self::Snippet, Self::Dependency, Self::CrateDocumentation];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Snippet => "snippet",
            Self::Dependency => "dependency",
            Self::CrateDocumentation => "crate_documentation",
        }
    }

    /// Filter selecting only this kind
    pub fn filter(&self) -> PayloadFilter {
        PayloadFilter::new().equals(KIND_FIELD, self.as_str())
    }
}

/// Shared payload conversion for all record types
pub trait Record: Serialize + DeserializeOwned {
    const KIND: RecordKind;

    /// Text sent to the embedding service for this record
    fn embedding_text(&self) -> String;

    /// Serialize to a payload tagged with `kind`
    fn to_payload(&self) -> Result<Payload, serde_json::Error> {
        let mut payload = match serde_json::to_value(self)? {
            Value::Object(map) => map,
            _ => Payload::new(),
        };
        payload.insert(
            KIND_FIELD.to_string(),
            Value::String(Self::KIND.as_str().to_string()),
        );
        Ok(payload)
    }

    /// Parse back from a hit payload; bookkeeping fields are ignored
    fn from_payload(payload: &Payload) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(payload.clone()))
    }
}

/// A stored piece of code
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeSnippet {
    pub code: String,
    pub language: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Record for CodeSnippet {
    const KIND: RecordKind = RecordKind::Snippet;

    fn embedding_text(&self) -> String {
        if self.description.trim().is_empty() {
            self.code.clone()
        } else {
            format!("{}\n\n{}", self.description.trim(), self.code)
        }
    }
}

/// A library dependency worth remembering
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    pub version: String,
    pub language: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub usage_example: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Record for Dependency {
    const KIND: RecordKind = RecordKind::Dependency;

    fn embedding_text(&self) -> String {
        let mut text = format!("{} {} ({})", self.name, self.version, self.language);
        if !self.description.trim().is_empty() {
            text.push_str(": ");
            text.push_str(self.description.trim());
        }
        if let Some(example) = &self.usage_example {
            text.push_str("\n\n");
            text.push_str(example);
        }
        text
    }
}

/// Documentation for one crate version
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrateDocumentation {
    pub name: String,
    pub version: String,
    pub documentation: String,
    #[serde(default)]
    pub examples: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Record for CrateDocumentation {
    const KIND: RecordKind = RecordKind::CrateDocumentation;

    fn embedding_text(&self) -> String {
        format!("{} {}\n\n{}", self.name, self.version, self.documentation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_carries_kind_and_fields() {
        let snippet = CodeSnippet {
            code: "print('hi')".to_string(),
            language: "python".to_string(),
            tags: vec!["greeting".to_string()],
            ..Default::default()
        };

        let payload = snippet.to_payload().unwrap();
        assert_eq!(payload[KIND_FIELD], json!("snippet"));
        assert_eq!(payload["language"], json!("python"));
        assert_eq!(payload["tags"], json!(["greeting"]));
    }

    #[test]
    fn test_from_payload_ignores_bookkeeping_fields() {
        let payload = json!({
            "kind": "crate_documentation",
            "created_at": "2024-01-01T00:00:00.000Z",
            "name": "serde",
            "version": "1.0.219",
            "documentation": "Serialization framework"
        });

        let docs =
            CrateDocumentation::from_payload(payload.as_object().unwrap()).unwrap();
        assert_eq!(docs.name, "serde");
        assert!(docs.examples.is_empty());
    }

    #[test]
    fn test_embedding_text_includes_description() {
        let snippet = CodeSnippet {
            code: "x = 1".to_string(),
            language: "python".to_string(),
            description: "assign one".to_string(),
            ..Default::default()
        };
        assert_eq!(snippet.embedding_text(), "assign one\n\nx = 1");

        let dep = Dependency {
            name: "tokio".to_string(),
            version: "1".to_string(),
            language: "rust".to_string(),
            ..Default::default()
        };
        assert_eq!(dep.embedding_text(), "tokio 1 (rust)");
    }

    #[test]
    fn test_kind_filter() {
        let filter = RecordKind::Dependency.filter();
        let payload = Dependency::default().to_payload().unwrap();
        assert!(filter.matches(&payload));
        assert!(!RecordKind::Snippet.filter().matches(&payload));
    }
}
