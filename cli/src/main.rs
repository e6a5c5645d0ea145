use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use triage_api::{AssessmentPipeline, ClientConfig, FetchPolicy};
use triage_core::RiskConfig;

const API_KEY_ENV: &str = "TRIAGE_API_KEY";

/// Exit status for a missing credential, distinct from a failed run.
const MISSING_KEY_EXIT: u8 = 2;

#[derive(Parser, Debug)]
#[command(
    name = "triage-cli",
    about = "Fetch patient records, classify clinical risk, and submit the assessment."
)]
struct Args {
    /// API key sent as `x-api-key` on every request.
    #[arg(long, env = API_KEY_ENV, hide_env_values = true)]
    api_key: Option<String>,

    /// Base URL of the patient service.
    #[arg(long, env = "TRIAGE_BASE_URL", default_value = "http://localhost:8080")]
    base_url: String,

    #[arg(long, default_value_t = 20)]
    page_size: u32,

    /// Attempts per page before giving up on a transient error.
    #[arg(long, default_value_t = 3)]
    max_attempts: u32,

    /// Backoff unit; retry n waits n times this.
    #[arg(long, default_value_t = 1000)]
    base_delay_ms: u64,

    /// Pause between page requests.
    #[arg(long, default_value_t = 500)]
    page_delay_ms: u64,

    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,

    /// Print the payload instead of submitting it.
    #[arg(long)]
    dry_run: bool,
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let Some(api_key) = api_key(&args) else {
        eprintln!("{}", missing_key_message());
        return ExitCode::from(MISSING_KEY_EXIT);
    };

    if let Err(err) = init_tracing() {
        eprintln!("Could not set up logging: {err:#}");
        return ExitCode::FAILURE;
    }

    match run(args, api_key) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Assessment run failed: {err:#}");
            ExitCode::FAILURE
        }
    }
}

/// The configured key, unless it is absent or blank.
fn api_key(args: &Args) -> Option<String> {
    args.api_key
        .as_deref()
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
}

fn missing_key_message() -> String {
    format!(
        "Missing API key. Set {API_KEY_ENV} in the environment or a .env file, \
         or pass --api-key <KEY>."
    )
}

fn init_tracing() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("triage=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()?;
    Ok(())
}

#[tokio::main]
async fn run(args: Args, api_key: String) -> anyhow::Result<()> {
    let client = ClientConfig {
        timeout: Duration::from_secs(args.timeout_secs),
        ..ClientConfig::new(&args.base_url, api_key)
    };
    let policy = FetchPolicy {
        page_size: args.page_size,
        max_attempts: args.max_attempts,
        base_delay: Duration::from_millis(args.base_delay_ms),
        page_delay: Duration::from_millis(args.page_delay_ms),
    };

    let pipeline = AssessmentPipeline::connect(&client, policy, RiskConfig::default())
        .context("Could not build the HTTP client")?;

    tracing::info!("++ Assessing patients from {}", args.base_url);

    if args.dry_run {
        let report = pipeline.assess().await?;
        print_summary(&report);
        println!("{}", serde_json::to_string_pretty(&report.assessment)?);
        return Ok(());
    }

    let outcome = pipeline.run().await?;
    print_summary(&outcome.report);
    println!("{}", serde_json::to_string_pretty(&outcome.acknowledgement)?);
    Ok(())
}

fn print_summary(report: &triage_core::AssessmentReport) {
    println!(
        "Generated at: {}\nRecords: {} ({} scored)\nHigh risk: {}\nFever: {}\nData quality issues: {}",
        report.generated_at,
        report.records_total,
        report.records_scored,
        report.assessment.high_risk_patients.len(),
        report.assessment.fever_patients.len(),
        report.assessment.data_quality_issues.len()
    );
}
