//! Crate documentation tools
//!
//! Documentation is stored like any other record but read back by exact
//! name/version match (scroll), not by similarity.

use regex::Regex;
use rmcp::{ErrorData as McpError, model::CallToolResult, schemars};
use std::fmt::Write as _;
use std::sync::LazyLock;
use validator::Validate;

use super::{ToolContext, code_block, failure, normalize_tags, not_blank, success, validate_params};
use crate::records::{CrateDocumentation, Record, RecordKind};
use crate::vector_store::PointRecord;

/// crates.io package names
static CRATE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_-]*$").expect("valid crate name regex"));

#[derive(Debug, serde::Deserialize, schemars::JsonSchema, Validate)]
pub struct StoreCrateDocumentationParams {
    #[schemars(description = "Crate name as published on crates.io")]
    #[validate(length(min = 1, max = 64), regex(path = *CRATE_NAME))]
    pub name: String,
    #[schemars(description = "Crate version the documentation applies to")]
    #[validate(custom(function = "not_blank"), length(max = 64))]
    pub version: String,
    #[schemars(description = "Documentation text (Markdown)")]
    #[validate(custom(function = "not_blank"), length(max = 200000))]
    pub documentation: String,
    #[schemars(description = "Code examples")]
    #[validate(length(max = 50))]
    pub examples: Option<Vec<String>>,
    #[schemars(description = "Tags for filtering")]
    #[validate(length(max = 32))]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema, Validate)]
pub struct GetCrateDocumentationParams {
    #[schemars(description = "Crate name")]
    #[validate(length(min = 1, max = 64), regex(path = *CRATE_NAME))]
    pub name: String,
    #[schemars(description = "Only documentation for this exact version")]
    #[validate(custom(function = "not_blank"), length(max = 64))]
    pub version: Option<String>,
    #[schemars(description = "Maximum number of entries (1-20, default 5), newest first")]
    #[validate(range(min = 1, max = 20))]
    pub limit: Option<usize>,
}

/// Embed and store documentation for one crate version
pub async fn store_crate_documentation(
    ctx: &ToolContext,
    params: StoreCrateDocumentationParams,
) -> Result<CallToolResult, McpError> {
    if let Err(rejection) = validate_params("store_crate_documentation", &params) {
        return Ok(rejection);
    }

    let docs = CrateDocumentation {
        name: params.name,
        version: params.version.trim().to_string(),
        documentation: params.documentation,
        examples: params
            .examples
            .unwrap_or_default()
            .into_iter()
            .filter(|e| !e.trim().is_empty())
            .collect(),
        tags: normalize_tags(params.tags),
    };

    let embedding = match ctx.embedder.embed(&docs.embedding_text()).await {
        Ok(embedding) => embedding,
        Err(e) => {
            tracing::error!("Embedding failed for {} docs: {}", docs.name, e);
            return Ok(failure(format!("Failed to store crate documentation: {}", e)));
        }
    };

    let payload = docs
        .to_payload()
        .map_err(|e| McpError::internal_error(e.to_string(), None))?;

    match ctx.store.store(payload, embedding).await {
        Ok(receipt) => {
            tracing::info!(id = %receipt.id, "Stored documentation for {} {}", docs.name, docs.version);
            Ok(success(format!(
                "✓ Documentation stored for {} {}\n\n- ID: {}\n- examples: {}\n",
                docs.name,
                docs.version,
                receipt.id,
                docs.examples.len()
            )))
        }
        Err(e) => {
            tracing::error!("Vector store rejected {} docs: {}", docs.name, e);
            Ok(failure(format!("Failed to store crate documentation: {}", e)))
        }
    }
}

/// Fetch stored documentation by crate name (and optionally version)
pub async fn get_crate_documentation(
    ctx: &ToolContext,
    params: GetCrateDocumentationParams,
) -> Result<CallToolResult, McpError> {
    if let Err(rejection) = validate_params("get_crate_documentation", &params) {
        return Ok(rejection);
    }

    let limit = params.limit.unwrap_or(5);
    let version = params.version.map(|v| v.trim().to_string());

    let mut filter = RecordKind::CrateDocumentation
        .filter()
        .equals("name", params.name.clone());
    if let Some(version) = &version {
        filter = filter.equals("version", version.clone());
    }

    // Recency lives in the payload, so every match is read before sorting
    let mut records = match ctx.store.scroll(Some(filter), usize::MAX).await {
        Ok(records) => records,
        Err(e) => {
            tracing::error!("Failed to read documentation for {}: {}", params.name, e);
            return Ok(failure(format!("Failed to get crate documentation: {}", e)));
        }
    };

    if records.is_empty() {
        let target = match &version {
            Some(v) => format!("{} {}", params.name, v),
            None => params.name.clone(),
        };
        return Ok(success(format!("No documentation found for {}.", target)));
    }

    // RFC 3339 timestamps in UTC sort lexicographically
    records.sort_by(|a, b| created_at(b).cmp(created_at(a)));
    records.truncate(limit);

    let mut response = String::new();
    for record in &records {
        render_docs(&mut response, record);
    }
    Ok(success(response))
}

fn created_at(record: &PointRecord) -> &str {
    record
        .payload
        .get("created_at")
        .and_then(|v| v.as_str())
        .unwrap_or("")
}

fn render_docs(out: &mut String, record: &PointRecord) {
    let docs = match CrateDocumentation::from_payload(&record.payload) {
        Ok(docs) => docs,
        Err(e) => {
            tracing::warn!("Skipping malformed documentation payload {}: {}", record.id, e);
            return;
        }
    };

    let _ = writeln!(out, "# {} {}\n", docs.name, docs.version);
    let _ = writeln!(out, "- ID: {}", record.id);
    if !created_at(record).is_empty() {
        let _ = writeln!(out, "- created_at: {}", created_at(record));
    }
    if !docs.tags.is_empty() {
        let _ = writeln!(out, "- tags: {}", docs.tags.join(", "));
    }
    let _ = writeln!(out, "\n{}\n", docs.documentation.trim());

    if !docs.examples.is_empty() {
        out.push_str("## Examples\n\n");
        for example in &docs.examples {
            let _ = writeln!(out, "{}\n", code_block("rust", example));
        }
    }
}
