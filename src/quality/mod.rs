//! Code formatting and linting through external tools
//!
//! Each supported language maps to a formatter and a linter binary:
//! - Rust: `rustfmt` + `cargo clippy` (inside a throwaway cargo project)
//! - JavaScript/TypeScript: `prettier` + `eslint`
//! - Python: `black` + `pylint`
//!
//! The snippet is written to a temporary directory. A missing binary is
//! not an error; it becomes a note in the report and the original code is
//! returned unformatted.

use serde::Serialize;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Errors that stop a review before any tool runs
#[derive(Error, Debug)]
pub enum QualityError {
    #[error("Failed to prepare scratch directory: {0}")]
    Io(#[from] std::io::Error),
}

/// Languages with a known toolchain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Rust,
    JavaScript,
    Jsx,
    TypeScript,
    Tsx,
    Python,
}

impl Language {
    /// Accepts names and common extensions, case-insensitively
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "rust" | "rs" => Some(Self::Rust),
            "javascript" | "js" | "node" => Some(Self::JavaScript),
            "jsx" => Some(Self::Jsx),
            "typescript" | "ts" => Some(Self::TypeScript),
            "tsx" => Some(Self::Tsx),
            "python" | "py" => Some(Self::Python),
            _ => None,
        }
    }

    /// File extension; prettier and eslint pick their parser from it
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Rust => "rs",
            Self::JavaScript => "js",
            Self::Jsx => "jsx",
            Self::TypeScript => "ts",
            Self::Tsx => "tsx",
            Self::Python => "py",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rust => "rust",
            Self::JavaScript => "javascript",
            Self::Jsx => "jsx",
            Self::TypeScript => "typescript",
            Self::Tsx => "tsx",
            Self::Python => "python",
        }
    }
}

/// Captured output of a tool that ran to completion
#[derive(Debug, Clone, Serialize)]
pub struct ToolOutput {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// What happened when a tool was invoked
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ToolOutcome {
    Ran { tool: String, output: ToolOutput },
    Missing { tool: String },
    TimedOut { tool: String, after_secs: u64 },
    Failed { tool: String, error: String },
}

impl ToolOutcome {
    pub fn tool(&self) -> &str {
        match self {
            Self::Ran { tool, .. }
            | Self::Missing { tool }
            | Self::TimedOut { tool, .. }
            | Self::Failed { tool, .. } => tool,
        }
    }

    /// One-line informational text for outcomes that produced no output
    pub fn note(&self) -> Option<String> {
        match self {
            Self::Ran { .. } => None,
            Self::Missing { tool } => Some(format!("{} is not installed; skipped", tool)),
            Self::TimedOut { tool, after_secs } => {
                Some(format!("{} did not finish within {}s; skipped", tool, after_secs))
            }
            Self::Failed { tool, error } => Some(format!("{} could not be run: {}", tool, error)),
        }
    }
}

/// Result of formatting and linting one snippet
#[derive(Debug, Clone, Serialize)]
pub struct ReviewReport {
    pub language: String,
    pub original: String,
    /// Formatter output, `None` when formatting was unavailable or failed
    pub formatted: Option<String>,
    pub format: Option<ToolOutcome>,
    pub lint: Option<ToolOutcome>,
    pub notes: Vec<String>,
}

impl ReviewReport {
    /// Formatted code if we have it, otherwise the original
    pub fn code(&self) -> &str {
        self.formatted.as_deref().unwrap_or(&self.original)
    }

    /// Lint findings, or `None` when the linter didn't run
    pub fn lint_output(&self) -> Option<String> {
        match &self.lint {
            Some(ToolOutcome::Ran { output, .. }) => {
                let combined = format!("{}{}", output.stdout, output.stderr);
                Some(combined.trim().to_string())
            }
            _ => None,
        }
    }
}

/// Runs formatter/linter binaries with a per-invocation timeout
#[derive(Debug, Clone)]
pub struct QualityRunner {
    timeout: Duration,
}

impl Default for QualityRunner {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

impl QualityRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Format and lint `code` written in `language`
    pub async fn review(&self, code: &str, language: &str) -> Result<ReviewReport, QualityError> {
        let mut report = ReviewReport {
            language: language.to_string(),
            original: code.to_string(),
            formatted: None,
            format: None,
            lint: None,
            notes: Vec::new(),
        };

        let Some(lang) = Language::parse(language) else {
            report.notes.push(format!(
                "No formatter or linter configured for '{}'; supported: rust, javascript, typescript, python",
                language
            ));
            return Ok(report);
        };
        report.language = lang.as_str().to_string();

        let scratch = tempfile::Builder::new().prefix("code-review-").tempdir()?;
        let file_name = format!("snippet.{}", lang.extension());

        let (format, lint) = match lang {
            Language::Rust => {
                write_cargo_project(scratch.path(), code)?;
                let format = self
                    .run_tool("rustfmt", &["--edition", "2021"], scratch.path(), Some(code))
                    .await;
                let lint = self
                    .run_tool(
                        "cargo",
                        &["clippy", "--quiet", "--message-format", "short"],
                        scratch.path(),
                        None,
                    )
                    .await;
                (format, lint)
            }
            Language::JavaScript | Language::Jsx | Language::TypeScript | Language::Tsx => {
                std::fs::write(scratch.path().join(&file_name), code)?;
                let format = self
                    .run_tool(
                        "prettier",
                        &["--stdin-filepath", &file_name],
                        scratch.path(),
                        Some(code),
                    )
                    .await;
                let lint = self
                    .run_tool("eslint", &["--format", "unix", &file_name], scratch.path(), None)
                    .await;
                (format, lint)
            }
            Language::Python => {
                std::fs::write(scratch.path().join(&file_name), code)?;
                let format = self
                    .run_tool("black", &["--quiet", "-"], scratch.path(), Some(code))
                    .await;
                let lint = self
                    .run_tool(
                        "pylint",
                        &["--output-format=text", "--score=n", &file_name],
                        scratch.path(),
                        None,
                    )
                    .await;
                (format, lint)
            }
        };

        match &format {
            ToolOutcome::Ran { output, .. } if output.success && !output.stdout.trim().is_empty() => {
                report.formatted = Some(output.stdout.clone());
            }
            ToolOutcome::Ran { tool, output } => {
                report.notes.push(format!(
                    "{} could not format the code: {}",
                    tool,
                    output.stderr.trim()
                ));
            }
            other => report.notes.extend(other.note()),
        }
        report.notes.extend(lint.note());

        report.format = Some(format);
        report.lint = Some(lint);
        Ok(report)
    }

    /// Spawn `program`, optionally feeding `stdin`, and capture its output
    pub async fn run_tool(
        &self,
        program: &str,
        args: &[&str],
        cwd: &Path,
        stdin: Option<&str>,
    ) -> ToolOutcome {
        let tool = program.to_string();
        let mut command = Command::new(program);
        command
            .args(args)
            .current_dir(cwd)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("{} not found on PATH", program);
                return ToolOutcome::Missing { tool };
            }
            Err(e) => {
                return ToolOutcome::Failed {
                    tool,
                    error: e.to_string(),
                };
            }
        };

        // Feed stdin from a separate task so a chatty tool can't deadlock us
        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            let input = input.to_string();
            tokio::spawn(async move {
                if let Err(e) = pipe.write_all(input.as_bytes()).await {
                    tracing::debug!("Failed to write tool stdin: {}", e);
                }
            });
        }

        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => ToolOutcome::Ran {
                tool,
                output: ToolOutput {
                    success: output.status.success(),
                    exit_code: output.status.code(),
                    stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                },
            },
            Ok(Err(e)) => ToolOutcome::Failed {
                tool,
                error: e.to_string(),
            },
            Err(_) => {
                tracing::warn!("{} timed out after {:?}", program, self.timeout);
                ToolOutcome::TimedOut {
                    tool,
                    after_secs: self.timeout.as_secs(),
                }
            }
        }
    }
}

/// Minimal library crate so clippy has something to check
fn write_cargo_project(dir: &Path, code: &str) -> std::io::Result<()> {
    std::fs::write(
        dir.join("Cargo.toml"),
        "[package]\nname = \"review_snippet\"\nversion = \"0.1.0\"\nedition = \"2021\"\n\n[lib]\npath = \"src/lib.rs\"\n\n[workspace]\n",
    )?;
    std::fs::create_dir_all(dir.join("src"))?;
    std::fs::write(dir.join("src").join("lib.rs"), code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_parse() {
        assert_eq!(Language::parse("Rust"), Some(Language::Rust));
        assert_eq!(Language::parse("py"), Some(Language::Python));
        assert_eq!(Language::parse("ts"), Some(Language::TypeScript));
        assert_eq!(Language::parse("TSX"), Some(Language::Tsx));
        assert_eq!(Language::parse("jsx"), Some(Language::Jsx));
        assert_eq!(Language::parse("cobol"), None);
    }

    #[test]
    fn test_jsx_keeps_its_extension() {
        assert_eq!(Language::Jsx.extension(), "jsx");
        assert_eq!(Language::Tsx.extension(), "tsx");
        assert_eq!(Language::TypeScript.extension(), "ts");
    }

    #[tokio::test]
    async fn test_unsupported_language_returns_note() {
        let report = QualityRunner::default()
            .review("IDENTIFICATION DIVISION.", "cobol")
            .await
            .unwrap();

        assert!(report.formatted.is_none());
        assert!(report.format.is_none());
        assert_eq!(report.code(), "IDENTIFICATION DIVISION.");
        assert!(report.notes[0].contains("cobol"));
    }

    #[tokio::test]
    async fn test_missing_tool_is_reported_not_raised() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = QualityRunner::default()
            .run_tool("definitely-not-a-real-formatter", &[], dir.path(), None)
            .await;

        assert!(matches!(outcome, ToolOutcome::Missing { .. }));
        assert!(outcome.note().unwrap().contains("not installed"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_tool_pipes_stdin_to_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = QualityRunner::default()
            .run_tool("cat", &[], dir.path(), Some("x = 1\n"))
            .await;

        match outcome {
            ToolOutcome::Ran { output, .. } => {
                assert!(output.success);
                assert_eq!(output.stdout, "x = 1\n");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_tool_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = QualityRunner::new(Duration::from_millis(100))
            .run_tool("sleep", &["5"], dir.path(), None)
            .await;

        assert!(matches!(outcome, ToolOutcome::TimedOut { .. }));
    }

    #[test]
    fn test_write_cargo_project() {
        let dir = tempfile::tempdir().unwrap();
        write_cargo_project(dir.path(), "pub fn f() {}").unwrap();

        assert!(dir.path().join("Cargo.toml").exists());
        let lib = std::fs::read_to_string(dir.path().join("src/lib.rs")).unwrap();
        assert_eq!(lib, "pub fn f() {}");
    }
}
