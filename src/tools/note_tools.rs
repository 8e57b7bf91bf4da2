//! Note tools (in-memory, lost on restart)

use rmcp::{ErrorData as McpError, model::CallToolResult, schemars};
use std::fmt::Write as _;
use validator::Validate;

use super::{ToolContext, not_blank, success, validate_params};

#[derive(Debug, serde::Deserialize, schemars::JsonSchema, Validate)]
pub struct AddNoteParams {
    #[schemars(description = "Note title; adding a note with an existing title replaces it")]
    #[validate(custom(function = "not_blank"), length(max = 200))]
    pub title: String,
    #[schemars(description = "Note content")]
    #[validate(length(max = 100000))]
    pub content: String,
}

pub fn add_note(ctx: &ToolContext, params: AddNoteParams) -> Result<CallToolResult, McpError> {
    if let Err(rejection) = validate_params("add_note", &params) {
        return Ok(rejection);
    }

    let title = params.title.trim().to_string();
    let replaced = ctx.notes.add(title.clone(), params.content);
    tracing::info!(replaced, "Saved note '{}'", title);

    let verb = if replaced { "updated" } else { "added" };
    Ok(success(format!(
        "✓ Note '{}' {} (resource: {})",
        title,
        verb,
        ctx.notes
            .get(&title)
            .map(|n| n.uri())
            .unwrap_or_default()
    )))
}

pub fn list_notes(ctx: &ToolContext) -> Result<CallToolResult, McpError> {
    let notes = ctx.notes.list();
    if notes.is_empty() {
        return Ok(success("No notes yet."));
    }

    let mut response = format!("{} note(s):\n\n", notes.len());
    for note in &notes {
        let _ = writeln!(response, "## {}\n", note.title);
        let _ = writeln!(response, "{}\n", note.content.trim_end());
    }
    Ok(success(response))
}
