//! Health monitoring tool

use rmcp::{ErrorData as McpError, model::CallToolResult};

use super::{ToolContext, success};
use crate::monitoring::{HealthMonitor, Status};

/// Check vector store and embedding service health
pub async fn health_check(ctx: &ToolContext) -> Result<CallToolResult, McpError> {
    tracing::info!("Performing health check");

    let monitor = HealthMonitor::new(ctx.store.clone(), ctx.embedder.clone());
    let health = monitor.check_health().await;

    let json = serde_json::to_string_pretty(&health)
        .map_err(|e| McpError::internal_error(format!("Failed to serialize health: {}", e), None))?;

    let status_emoji = match health.overall {
        Status::Healthy => "✅",
        Status::Degraded => "⚠️",
        Status::Unhealthy => "❌",
    };

    let message = format!(
        "{} System Health: {:?}\n\n{}\n\nNotes in memory: {}",
        status_emoji,
        health.overall,
        json,
        ctx.notes.len()
    );

    Ok(success(message))
}
