//! MCP tools
//!
//! Every handler follows the same shape: validate the parameters, optionally
//! fetch an embedding, call the vector store, render Markdown. Downstream
//! failures come back as `CallToolResult` text flagged `isError: true`
//! rather than protocol errors.

pub mod dependency_tools;
pub mod docs_tools;
pub mod health_tool;
pub mod note_tools;
pub mod quality_tools;
pub mod router;
pub mod snippet_tools;
pub mod stats_tool;

pub use router::CodeSnippetServer;

use rmcp::model::{CallToolResult, Content};
use std::sync::Arc;
use validator::{Validate, ValidationError};

use crate::embeddings::EmbeddingProvider;
use crate::notes::NoteStore;
use crate::quality::QualityRunner;
use crate::vector_store::VectorStore;

/// Explicitly constructed handles every tool needs
#[derive(Clone)]
pub struct ToolContext {
    pub store: VectorStore,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub notes: NoteStore,
    pub quality: QualityRunner,
}

impl ToolContext {
    pub fn new(
        store: VectorStore,
        embedder: Arc<dyn EmbeddingProvider>,
        notes: NoteStore,
        quality: QualityRunner,
    ) -> Self {
        Self {
            store,
            embedder,
            notes,
            quality,
        }
    }
}

/// Successful text response
pub(crate) fn success(text: impl Into<String>) -> CallToolResult {
    CallToolResult::success(vec![Content::text(text.into())])
}

/// Failed text response (`isError: true`)
pub(crate) fn failure(text: impl Into<String>) -> CallToolResult {
    CallToolResult::error(vec![Content::text(text.into())])
}

/// Run `validator` rules, turning violations into a failure response
pub(crate) fn validate_params<P: Validate>(tool: &str, params: &P) -> Result<(), CallToolResult> {
    params.validate().map_err(|errors| {
        tracing::debug!("{} rejected invalid input: {}", tool, errors);
        failure(format!("Invalid input for {}:\n{}", tool, errors))
    })
}

/// Rejects strings that are empty or whitespace only
pub(crate) fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("blank");
        error.message = Some("must not be blank".into());
        return Err(error);
    }
    Ok(())
}

/// Trim, drop empties, and dedupe tags while keeping their order
pub(crate) fn normalize_tags(tags: Option<Vec<String>>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    tags.unwrap_or_default()
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty() && seen.insert(t.clone()))
        .collect()
}

/// Optional free text: trimmed, with empty strings treated as absent
pub(crate) fn clean_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Markdown code fence for `code` tagged with `language`
pub(crate) fn code_block(language: &str, code: &str) -> String {
    let fence = if code.contains("```") { "````" } else { "```" };
    format!("{fence}{language}\n{}\n{fence}", code.trim_end_matches('\n'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_tags() {
        let tags = normalize_tags(Some(vec![
            " io ".to_string(),
            "".to_string(),
            "io".to_string(),
            "cli".to_string(),
        ]));
        assert_eq!(tags, vec!["io", "cli"]);
        assert!(normalize_tags(None).is_empty());
    }

    #[test]
    fn test_not_blank() {
        assert!(not_blank("x").is_ok());
        assert!(not_blank("  \n").is_err());
    }

    #[test]
    fn test_code_block_escapes_inner_fences() {
        assert_eq!(code_block("rust", "fn a() {}\n"), "```rust\nfn a() {}\n```");
        assert!(code_block("md", "```x```").starts_with("````md"));
    }

    #[test]
    fn test_clean_optional() {
        assert_eq!(clean_optional(Some("  ".to_string())), None);
        assert_eq!(clean_optional(Some(" a ".to_string())), Some("a".to_string()));
    }
}
