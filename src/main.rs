//! CLI entry point for the library download stats report.
//!
//! Reports last week's downloads of the CircuitPython bundle from its GitHub
//! releases, and of each published library from pypistats.org.

use anyhow::Result;
use chrono::Local;
use clap::Parser;
use lib_download_stats::{
    config::StatsConfig,
    fetch::{BasicClient, HttpClient, auth::ApiKey},
    infra::{
        github::{GitHubClient, LibraryCatalog},
        pypi::PypiClient,
    },
    output::{ReportConfig, ReportWriter},
    report::run_stat_check,
};
use std::ffi::OsStr;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    filter::LevelFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "lib_download_stats")]
#[command(
    about = "Download stats for the Adafruit CircuitPython Bundle, and PyPI where available",
    long_about = None
)]
struct Cli {
    /// Output log to the filename provided
    #[arg(short = 'o', long = "output_file", value_name = "OUTPUT FILENAME")]
    output_file: Option<PathBuf>,

    /// Verbosity printed to the command prompt. Zero is off; one is on
    #[arg(
        short = 'v',
        long = "verbose",
        default_value_t = 1,
        value_parser = clap::value_parser!(u8).range(0..=1)
    )]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    let _file_guard = init_tracing();
    let cli = Cli::parse();
    let config = StatsConfig::from_env();

    let mut out = ReportWriter::new(ReportConfig {
        output_file: cli.output_file,
        verbosity: cli.verbose.into(),
    });

    let result = run(&config, &mut out).await;
    if let Err(e) = &result {
        error!(error = %format!("{e:#}"), "Stats run failed");
        out.record_failure(e);
    }

    // The report file is written whether or not the run succeeded.
    if let Err(e) = out.finish() {
        error!(error = %e, "Failed to write report file");
        if result.is_ok() {
            return Err(e.into());
        }
    }

    result
}

/// Logging setup: colored stderr + JSON rolling log file.
fn init_tracing() -> WorkerGuard {
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/lib_download_stats.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("lib_download_stats.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive(LevelFilter::INFO.into()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive(LevelFilter::DEBUG.into()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    guard
}

/// Builds the API clients and writes the report.
#[tracing::instrument(skip_all)]
async fn run<W: Write>(config: &StatsConfig, out: &mut ReportWriter<W>) -> Result<()> {
    let http = BasicClient::new()?;

    match &config.github_token {
        Some(token) => {
            info!("Using authenticated GitHub requests");
            let github = GitHubClient::new(
                ApiKey::github_token(http.clone(), token)?,
                &config.github_api_url,
            );
            report(&github, http, config, out).await
        }
        None => {
            info!("No GitHub token configured, requests are rate limited");
            let github = GitHubClient::new(http.clone(), &config.github_api_url);
            report(&github, http, config, out).await
        }
    }
}

async fn report<G: HttpClient, W: Write>(
    github: &GitHubClient<G>,
    http: BasicClient,
    config: &StatsConfig,
    out: &mut ReportWriter<W>,
) -> Result<()> {
    let pypi = PypiClient::new(http, &config.pypistats_api_url, &config.pypi_url);
    let catalog = LibraryCatalog::new(
        github,
        &pypi,
        &config.library_owner,
        &config.library_prefix,
    );

    run_stat_check(github, &pypi, &catalog, config, out, Local::now()).await?;
    info!("Stats run complete");
    Ok(())
}
