//! Knowledge-base statistics

use rmcp::{ErrorData as McpError, model::CallToolResult};
use std::fmt::Write as _;

use super::{ToolContext, failure, success};
use crate::records::RecordKind;

pub async fn code_stats(ctx: &ToolContext) -> Result<CallToolResult, McpError> {
    let info = match ctx.store.collection_info().await {
        Ok(info) => info,
        Err(e) => {
            tracing::error!("Failed to read collection info: {}", e);
            return Ok(failure(format!("Failed to collect stats: {}", e)));
        }
    };

    let Some(info) = info else {
        return Ok(success(format!(
            "Collection {} does not exist yet. Notes in memory: {}",
            ctx.store.collection_name(),
            ctx.notes.len()
        )));
    };

    let total = match ctx.store.count(None).await {
        Ok(total) => total,
        Err(e) => {
            tracing::error!("Failed to count points: {}", e);
            return Ok(failure(format!("Failed to collect stats: {}", e)));
        }
    };

    let mut per_kind = Vec::with_capacity(RecordKind::ALL.len());
    for kind in RecordKind::ALL {
        match ctx.store.count(Some(kind.filter())).await {
            Ok(count) => per_kind.push((kind, count)),
            Err(e) => {
                tracing::error!("Failed to count {} points: {}", kind.as_str(), e);
                return Ok(failure(format!("Failed to collect stats: {}", e)));
            }
        }
    }

    let mut out = String::from("# Knowledge base statistics\n\n");
    let _ = writeln!(out, "- collection: {}", info.name);
    let _ = writeln!(
        out,
        "- vector size: {}",
        info.vector_size.unwrap_or(ctx.store.vector_size())
    );
    let _ = writeln!(out, "- total points: {}", total);
    for (kind, count) in per_kind {
        let _ = writeln!(out, "  - {}: {}", kind.as_str(), count);
    }
    let _ = writeln!(out, "- notes (in memory): {}", ctx.notes.len());

    Ok(success(out))
}
