//! Dependency tool

use rmcp::{ErrorData as McpError, model::CallToolResult, schemars};
use std::fmt::Write as _;
use validator::Validate;

use super::{
    ToolContext, clean_optional, failure, normalize_tags, not_blank, success, validate_params,
};
use crate::records::{Dependency, Record};

#[derive(Debug, serde::Deserialize, schemars::JsonSchema, Validate)]
pub struct StoreDependencyParams {
    #[schemars(description = "Package name")]
    #[validate(custom(function = "not_blank"), length(max = 214))]
    pub name: String,
    #[schemars(description = "Package version or version requirement")]
    #[validate(custom(function = "not_blank"), length(max = 64))]
    pub version: String,
    #[schemars(description = "Ecosystem language (rust, python, javascript, ...)")]
    #[validate(custom(function = "not_blank"), length(max = 64))]
    pub language: String,
    #[schemars(description = "What the dependency is used for")]
    #[validate(length(max = 4000))]
    pub description: Option<String>,
    #[schemars(description = "Short usage example")]
    #[validate(length(max = 20000))]
    pub usage_example: Option<String>,
    #[schemars(description = "Tags for filtering")]
    #[validate(length(max = 32))]
    pub tags: Option<Vec<String>>,
}

/// Embed and store a dependency record
pub async fn store_dependency(
    ctx: &ToolContext,
    params: StoreDependencyParams,
) -> Result<CallToolResult, McpError> {
    if let Err(rejection) = validate_params("store_dependency", &params) {
        return Ok(rejection);
    }

    let dependency = Dependency {
        name: params.name.trim().to_string(),
        version: params.version.trim().to_string(),
        language: params.language.trim().to_lowercase(),
        description: clean_optional(params.description).unwrap_or_default(),
        usage_example: clean_optional(params.usage_example),
        tags: normalize_tags(params.tags),
    };

    let embedding = match ctx.embedder.embed(&dependency.embedding_text()).await {
        Ok(embedding) => embedding,
        Err(e) => {
            tracing::error!("Embedding failed while storing dependency {}: {}", dependency.name, e);
            return Ok(failure(format!("Failed to store dependency: {}", e)));
        }
    };

    let payload = dependency
        .to_payload()
        .map_err(|e| McpError::internal_error(e.to_string(), None))?;

    match ctx.store.store(payload, embedding).await {
        Ok(receipt) => {
            tracing::info!(id = %receipt.id, "Stored dependency {}@{}", dependency.name, dependency.version);

            let mut response = String::from("✓ Dependency stored\n\n");
            let _ = writeln!(response, "- ID: {}", receipt.id);
            let _ = writeln!(response, "- name: {}", dependency.name);
            let _ = writeln!(response, "- version: {}", dependency.version);
            let _ = writeln!(response, "- language: {}", dependency.language);
            if !dependency.tags.is_empty() {
                let _ = writeln!(response, "- tags: {}", dependency.tags.join(", "));
            }
            Ok(success(response))
        }
        Err(e) => {
            tracing::error!("Vector store rejected dependency {}: {}", dependency.name, e);
            Ok(failure(format!("Failed to store dependency: {}", e)))
        }
    }
}
