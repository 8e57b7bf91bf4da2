//! Code review tool: formatter + linter output for a snippet

use rmcp::{ErrorData as McpError, model::CallToolResult, schemars};
use std::fmt::Write as _;
use validator::Validate;

use super::{ToolContext, code_block, failure, not_blank, success, validate_params};
use crate::quality::ReviewReport;

#[derive(Debug, serde::Deserialize, schemars::JsonSchema, Validate)]
pub struct CodeReviewParams {
    #[schemars(description = "The code to format and lint")]
    #[validate(custom(function = "not_blank"), length(max = 200000))]
    pub code: String,
    #[schemars(description = "Language of the code (rust, javascript, typescript, python)")]
    #[validate(custom(function = "not_blank"), length(max = 64))]
    pub language: String,
}

pub async fn code_review(
    ctx: &ToolContext,
    params: CodeReviewParams,
) -> Result<CallToolResult, McpError> {
    if let Err(rejection) = validate_params("code_review", &params) {
        return Ok(rejection);
    }

    match ctx.quality.review(&params.code, &params.language).await {
        Ok(report) => Ok(success(render_report(&report))),
        Err(e) => {
            tracing::error!("Code review failed: {}", e);
            Ok(failure(format!("Code review failed: {}", e)))
        }
    }
}

fn render_report(report: &ReviewReport) -> String {
    let mut out = format!("# Code review ({})\n\n", report.language);

    out.push_str(if report.formatted.is_some() {
        "## Formatted code\n\n"
    } else {
        "## Code (unformatted)\n\n"
    });
    let _ = writeln!(out, "{}\n", code_block(&report.language, report.code()));

    out.push_str("## Lint\n\n");
    match report.lint_output() {
        Some(findings) if findings.is_empty() => out.push_str("No issues found.\n"),
        Some(findings) => {
            let _ = writeln!(out, "```\n{}\n```", findings);
        }
        None => out.push_str("Linter did not run.\n"),
    }

    if !report.notes.is_empty() {
        out.push_str("\n## Notes\n\n");
        for note in &report.notes {
            let _ = writeln!(out, "- {}", note);
        }
    }

    out
}
