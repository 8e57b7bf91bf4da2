//! Code snippet tools
//!
//! - [`store_code_snippet`]: embed and store a snippet
//! - [`search_code_snippets`]: semantic search over stored snippets with
//!   optional language/tag filters and a minimum score

use rmcp::{ErrorData as McpError, model::CallToolResult, schemars};
use std::fmt::Write as _;
use validator::Validate;

use super::{
    ToolContext, clean_optional, code_block, failure, normalize_tags, not_blank, success,
    validate_params,
};
use crate::records::{CodeSnippet, Record, RecordKind};
use crate::vector_store::ScoredPoint;

/// Default number of search hits
pub const DEFAULT_SEARCH_LIMIT: usize = 5;

#[derive(Debug, serde::Deserialize, schemars::JsonSchema, Validate)]
pub struct StoreCodeSnippetParams {
    #[schemars(description = "The code to store")]
    #[validate(custom(function = "not_blank"), length(max = 100000))]
    pub code: String,
    #[schemars(description = "Programming language of the code (default: text)")]
    #[validate(length(min = 1, max = 64))]
    pub language: Option<String>,
    #[schemars(description = "What the code does")]
    #[validate(length(max = 4000))]
    pub description: Option<String>,
    #[schemars(description = "Where the code came from (file path, URL, project)")]
    #[validate(length(max = 1000))]
    pub source: Option<String>,
    #[schemars(description = "Tags for filtering")]
    #[validate(length(max = 32))]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema, Validate)]
pub struct SearchCodeSnippetsParams {
    #[schemars(description = "Natural language or code to search for")]
    #[validate(custom(function = "not_blank"), length(max = 10000))]
    pub query: String,
    #[schemars(description = "Only return snippets in this language")]
    #[validate(length(min = 1, max = 64))]
    pub language: Option<String>,
    #[schemars(description = "Only return snippets carrying at least one of these tags")]
    #[validate(length(max = 32))]
    pub tags: Option<Vec<String>>,
    #[schemars(description = "Maximum number of results (1-50, default 5)")]
    #[validate(range(min = 1, max = 50))]
    pub limit: Option<usize>,
    #[schemars(description = "Minimum similarity score between 0 and 1 (omit for no threshold)")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub min_score: Option<f32>,
}

/// Embed and store a code snippet
pub async fn store_code_snippet(
    ctx: &ToolContext,
    params: StoreCodeSnippetParams,
) -> Result<CallToolResult, McpError> {
    if let Err(rejection) = validate_params("store_code_snippet", &params) {
        return Ok(rejection);
    }

    let snippet = CodeSnippet {
        code: params.code,
        language: clean_optional(params.language)
            .map(|l| l.to_lowercase())
            .unwrap_or_else(|| "text".to_string()),
        description: clean_optional(params.description).unwrap_or_default(),
        source: clean_optional(params.source),
        tags: normalize_tags(params.tags),
    };

    let embedding = match ctx.embedder.embed(&snippet.embedding_text()).await {
        Ok(embedding) => embedding,
        Err(e) => {
            tracing::error!("Embedding failed while storing snippet: {}", e);
            return Ok(failure(format!("Failed to store code snippet: {}", e)));
        }
    };

    let payload = snippet
        .to_payload()
        .map_err(|e| McpError::internal_error(e.to_string(), None))?;

    let receipt = match ctx.store.store(payload, embedding).await {
        Ok(receipt) => receipt,
        Err(e) => {
            tracing::error!("Vector store rejected snippet: {}", e);
            return Ok(failure(format!("Failed to store code snippet: {}", e)));
        }
    };

    tracing::info!(id = %receipt.id, language = %snippet.language, "Stored code snippet");

    let mut response = String::from("✓ Code snippet stored\n\n");
    let _ = writeln!(response, "- ID: {}", receipt.id);
    let _ = writeln!(response, "- language: {}", snippet.language);
    if !snippet.description.is_empty() {
        let _ = writeln!(response, "- description: {}", snippet.description);
    }
    if let Some(source) = &snippet.source {
        let _ = writeln!(response, "- source: {}", source);
    }
    if !snippet.tags.is_empty() {
        let _ = writeln!(response, "- tags: {}", snippet.tags.join(", "));
    }
    let _ = writeln!(response, "- created_at: {}", receipt.created_at);

    Ok(success(response))
}

/// Semantic search over stored snippets
pub async fn search_code_snippets(
    ctx: &ToolContext,
    params: SearchCodeSnippetsParams,
) -> Result<CallToolResult, McpError> {
    if let Err(rejection) = validate_params("search_code_snippets", &params) {
        return Ok(rejection);
    }

    let limit = params.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);

    let mut filter = RecordKind::Snippet.filter();
    if let Some(language) = clean_optional(params.language) {
        filter = filter.equals("language", language.to_lowercase());
    }
    filter = filter.any_of("tags", normalize_tags(params.tags));

    let query_vector = match ctx.embedder.embed(&params.query).await {
        Ok(embedding) => embedding,
        Err(e) => {
            tracing::error!("Embedding failed while searching snippets: {}", e);
            return Ok(failure(format!("Failed to search code snippets: {}", e)));
        }
    };

    let hits = match ctx
        .store
        .search(query_vector, Some(filter), limit, params.min_score)
        .await
    {
        Ok(hits) => hits,
        Err(e) => {
            tracing::error!("Snippet search failed: {}", e);
            return Ok(failure(format!("Failed to search code snippets: {}", e)));
        }
    };

    tracing::info!("Snippet search for '{}' returned {} hit(s)", params.query, hits.len());

    if hits.is_empty() {
        return Ok(success(format!(
            "No code snippets matched \"{}\".",
            params.query
        )));
    }

    Ok(success(render_hits(&params.query, &hits)))
}

fn render_hits(query: &str, hits: &[ScoredPoint]) -> String {
    let mut response = format!("Found {} snippet(s) for \"{}\":\n", hits.len(), query);

    for (rank, hit) in hits.iter().enumerate() {
        let _ = write!(response, "\n### {}. {} (score {:.3})\n", rank + 1, hit.id, hit.score);

        let snippet = match CodeSnippet::from_payload(&hit.payload) {
            Ok(snippet) => snippet,
            Err(e) => {
                tracing::warn!("Skipping malformed snippet payload {}: {}", hit.id, e);
                response.push_str("(payload could not be read)\n");
                continue;
            }
        };

        let _ = writeln!(response, "- language: {}", snippet.language);
        if !snippet.description.is_empty() {
            let _ = writeln!(response, "- description: {}", snippet.description);
        }
        if let Some(source) = &snippet.source {
            let _ = writeln!(response, "- source: {}", source);
        }
        if !snippet.tags.is_empty() {
            let _ = writeln!(response, "- tags: {}", snippet.tags.join(", "));
        }
        if let Some(created_at) = hit.payload.get("created_at").and_then(|v| v.as_str()) {
            let _ = writeln!(response, "- created_at: {}", created_at);
        }
        let _ = writeln!(response, "\n{}", code_block(&snippet.language, &snippet.code));
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_search_params_validation() {
        let params = SearchCodeSnippetsParams {
            query: "parse json".to_string(),
            language: None,
            tags: None,
            limit: Some(0),
            min_score: Some(1.5),
        };
        let errors = params.validate().unwrap_err().to_string();
        assert!(errors.contains("limit"));
        assert!(errors.contains("min_score"));
    }

    #[test]
    fn test_store_params_reject_blank_code() {
        let params = StoreCodeSnippetParams {
            code: "   ".to_string(),
            language: None,
            description: None,
            source: None,
            tags: None,
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_render_hits_lists_fields() {
        let payload = json!({
            "kind": "snippet",
            "code": "print('hi')",
            "language": "python",
            "description": "greet",
            "tags": ["demo"]
        });
        let hits = vec![ScoredPoint {
            id: "abc".to_string(),
            score: 0.91234,
            payload: payload.as_object().cloned().unwrap(),
        }];

        let text = render_hits("print hi", &hits);
        assert!(text.contains("### 1. abc (score 0.912)"));
        assert!(text.contains("- language: python"));
        assert!(text.contains("- tags: demo"));
        assert!(text.contains("```python\nprint('hi')\n```"));
    }
}
