//! Step results and the final report

use serde::{Serialize, Serializer};
use std::fmt;
use std::time::Duration;

fn duration_ms<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}

/// Outcome of one conformance step
#[derive(Debug, Clone, Serialize)]
pub struct StepResult {
    pub name: String,
    pub passed: bool,
    #[serde(rename = "duration_ms", serialize_with = "duration_ms")]
    pub duration: Duration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepResult {
    pub fn pass(name: impl Into<String>, duration: Duration) -> Self {
        Self {
            name: name.into(),
            passed: true,
            duration,
            error: None,
        }
    }

    pub fn fail(name: impl Into<String>, duration: Duration, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: false,
            duration,
            error: Some(error.into()),
        }
    }
}

/// Everything a conformance run produced
#[derive(Debug, Clone, Serialize)]
pub struct HarnessReport {
    pub url: String,
    pub collection: String,
    pub steps: Vec<StepResult>,
    #[serde(rename = "total_duration_ms", serialize_with = "duration_ms")]
    pub total_duration: Duration,
}

impl HarnessReport {
    /// True when every recorded step passed
    pub fn passed(&self) -> bool {
        self.steps.iter().all(|s| s.passed)
    }

    pub fn failed_steps(&self) -> Vec<&StepResult> {
        self.steps.iter().filter(|s| !s.passed).collect()
    }

    pub fn step(&self, name: &str) -> Option<&StepResult> {
        self.steps.iter().find(|s| s.name == name)
    }

    /// Process exit code: 0 when all steps passed, 1 otherwise
    pub fn exit_code(&self) -> i32 {
        if self.passed() { 0 } else { 1 }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for HarnessReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Qdrant conformance: {} (collection {})", self.url, self.collection)?;
        writeln!(f, "{:-<60}", "")?;
        for step in &self.steps {
            writeln!(
                f,
                "{} {:<24} {:>8} ms",
                if step.passed { "✓" } else { "✗" },
                step.name,
                step.duration.as_millis()
            )?;
            if let Some(error) = &step.error {
                writeln!(f, "    {}", error)?;
            }
        }
        writeln!(f, "{:-<60}", "")?;
        let failed = self.failed_steps().len();
        write!(
            f,
            "{} passed, {} failed in {:.2}s",
            self.steps.len() - failed,
            failed,
            self.total_duration.as_secs_f64()
        )
    }
}
