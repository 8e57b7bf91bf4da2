//! Qdrant conformance runner
//!
//! Exit codes: 0 all steps passed, 1 a step failed, 2 the suite timed out.

use clap::Parser;
use code_snippet_mcp::harness::{
    ConformanceHarness, HarnessOptions, RunOutcome, default_collection_name,
};
use code_snippet_mcp::logging::env_filter;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "qdrant-conformance")]
#[command(about = "Check a live Qdrant instance against the REST behaviour the server relies on")]
struct Cli {
    /// Qdrant base URL
    #[arg(long, env = "QDRANT_URL", default_value = "http://localhost:6333")]
    url: String,

    /// API key; also enables the auth step
    #[arg(long, env = "QDRANT_API_KEY")]
    api_key: Option<String>,

    /// Collection to create and delete (default: conformance_<random>)
    #[arg(long)]
    collection: Option<String>,

    /// Vector dimensionality for the test collection
    #[arg(long, default_value_t = 4, value_parser = clap::value_parser!(u16).range(3..))]
    vector_size: u16,

    /// Abort the whole suite after this many seconds
    #[arg(long, default_value_t = 120)]
    timeout_secs: u64,

    /// Leave the test collection in place
    #[arg(long)]
    skip_cleanup: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Log level when RUST_LOG is unset
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(&cli.log_level))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let mut options = HarnessOptions::new(cli.url);
    options.api_key = cli.api_key.filter(|k| !k.is_empty());
    options.collection = cli.collection.unwrap_or_else(default_collection_name);
    options.vector_size = cli.vector_size as usize;
    options.skip_cleanup = cli.skip_cleanup;

    let harness = ConformanceHarness::new(options)?;
    let outcome = harness
        .run_with_timeout(Duration::from_secs(cli.timeout_secs))
        .await;

    match &outcome {
        RunOutcome::Completed(report) if cli.json => println!("{}", report.to_json()?),
        RunOutcome::Completed(report) => println!("{}", report),
        RunOutcome::TimedOut { after } => {
            eprintln!("✗ Conformance suite timed out after {}s", after.as_secs())
        }
    }

    std::process::exit(outcome.exit_code());
}
