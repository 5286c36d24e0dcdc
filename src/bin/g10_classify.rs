use clap::{Parser, Subcommand};
use octofhir_conformance::cli::{self, ClassifyInputs, Report, SuiteArgs};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "g10-classify")]
#[command(about = "Filter validator messages and check required terminology bindings")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the structural validator messages that survive filtering
    Filter {
        /// JSON array of {type, message} objects
        #[arg(short, long)]
        messages: PathBuf,
        #[command(flatten)]
        suite: SuiteArgs,
    },
    /// Filter structural messages and append required binding findings
    Classify {
        /// Resource under test (JSON)
        #[arg(short, long)]
        resource: PathBuf,
        /// Profile URL the resource was validated against
        #[arg(short, long)]
        profile: String,
        /// Structural validator messages (JSON array); omit for none
        #[arg(short, long)]
        messages: Option<PathBuf>,
        /// Profile binding metadata (JSON array)
        #[arg(short, long)]
        catalog: PathBuf,
        /// Terminology dataset (JSON)
        #[arg(short, long)]
        terminology: PathBuf,
        /// Timeout per terminology call in milliseconds
        #[arg(long, default_value = "10000")]
        timeout_ms: u64,
        #[command(flatten)]
        suite: SuiteArgs,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Cli::parse();

    let result = match args.command {
        Commands::Filter { messages, suite } => cli::run_filter(&messages, &suite),
        Commands::Classify {
            resource,
            profile,
            messages,
            catalog,
            terminology,
            timeout_ms,
            suite,
        } => {
            let inputs = ClassifyInputs {
                resource: &resource,
                profile: &profile,
                messages: messages.as_deref(),
                catalog: &catalog,
                terminology: &terminology,
                timeout: Duration::from_millis(timeout_ms),
            };
            cli::run_classify(&inputs, &suite).await
        }
    };

    match result.and_then(|report| print_report(&report)) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            eprintln!("❌ {err}");
            ExitCode::from(2)
        }
    }
}

fn print_report(report: &Report) -> octofhir_conformance::Result<bool> {
    println!("{}", report.to_json()?);
    Ok(report.passed())
}
