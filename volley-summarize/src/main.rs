use clap::Parser;
use std::io;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use volley_summarize::config::DEFAULT_LOG_LEVEL;
use volley_summarize::{load_snapshot, requested_percentiles, summarize, write_summary};

#[derive(Parser, Debug)]
#[command(
    name = "volley-summarize",
    about = "Latency and request-rate statistics of a finished run"
)]
struct Args {
    /// Path to a JSON snapshot holding the run's spec and results.
    #[arg(long)]
    input: PathBuf,

    /// Comma-separated percentiles, as fractions in [0, 1].
    /// Defaults to 0.5,0.75,0.9,0.95,0.99.
    #[arg(long)]
    percentiles: Option<String>,

    /// Pretty-print the JSON summary.
    #[arg(long, default_value_t = false)]
    pretty: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // stdout carries the summary, so logs go to stderr
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(DEFAULT_LOG_LEVEL.into())
                .from_env_lossy(),
        )
        .init();

    let args = Args::parse();
    let percentiles = requested_percentiles(args.percentiles.as_deref())?;

    let snapshot = load_snapshot(&args.input)?;
    if let Err(e) = snapshot.spec.validate() {
        warn!(error = %e, "snapshot spec would not pass validation");
    }

    let summary = summarize(&snapshot, &percentiles);
    if summary.latency.is_none() {
        warn!("snapshot holds no latency samples");
    }

    write_summary(io::stdout().lock(), &summary, args.pretty)?;
    info!(
        percentiles = percentiles.len(),
        requests = summary.statuses.total(),
        "summary written"
    );
    Ok(())
}
