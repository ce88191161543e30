//! epctl: command-line access to the European Parliament open-data API
//!
//! Thin shell over [`EuroparlClient`]; useful for poking at endpoints and for
//! checking the pipeline's latency figures.

use std::path::PathBuf;
use std::sync::LazyLock;

use clap::{Parser, Subcommand};
use europarl_gateway::telemetry::{self, HistogramSummary};
use europarl_gateway::{ClientConfig, EuroparlClient, MepQuery, Page, QueryParams};

static VERSION: LazyLock<String> = LazyLock::new(europarl_gateway::version_string);

/// European Parliament open-data CLI
#[derive(Parser)]
#[command(name = "epctl")]
#[command(version = VERSION.as_str())]
#[command(about = "Query the European Parliament open-data API")]
struct Args {
    /// Config file (default: ~/.europarl/config.toml, then /etc/europarl/config.toml)
    #[arg(short, long, env = "EUROPARL_CONFIG")]
    config: Option<PathBuf>,

    /// Print latency and cache statistics after the command
    #[arg(long)]
    stats: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch any endpoint and print the JSON body
    Fetch {
        /// Endpoint path relative to the API root (e.g. "meps/124810")
        endpoint: String,
        /// Query parameter as key=value (repeatable)
        #[arg(short = 'p', long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,
    },

    /// List current MEPs
    Meps {
        /// Country of representation (ISO code, e.g. SE)
        #[arg(long)]
        country: Option<String>,
        /// Maximum number of results
        #[arg(short, long, default_value_t = 20)]
        limit: u32,
    },
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((k, v)) if !k.is_empty() => Ok((k.to_string(), v.to_string())),
        _ => Err(format!("expected key=value, got '{raw}'")),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing (default: warn for CLI; override with RUST_LOG).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = ClientConfig::load(args.config.as_deref())?;
    tracing::info!(base_url = %config.base_url, "client configured");
    let client = EuroparlClient::from_config(config)?;

    let body = match args.command {
        Command::Fetch { endpoint, params } => {
            let params: QueryParams = params.into_iter().collect();
            client.fetch(&endpoint, &params).await
        }
        Command::Meps { country, limit } => {
            let mut query = MepQuery::new().page(Page::first(limit));
            if let Some(country) = country {
                query = query.country(country);
            }
            client.meps().current(&query).await
        }
    };

    match body {
        Ok(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        Err(e) => {
            let kind = e.kind();
            eprintln!("error ({kind}): {}", e.into_tool_error("epctl"));
            if args.stats {
                print_stats(&client);
            }
            std::process::exit(1);
        }
    }

    if args.stats {
        print_stats(&client);
    }
    Ok(())
}

fn print_stats(client: &EuroparlClient) {
    let metrics = client.metrics();
    eprintln!(
        "requests: {}  cache hits: {}  retries: {}  cache entries: {}  tokens left: {:.1}",
        metrics.counter_total(telemetry::REQUESTS_TOTAL),
        metrics.counter_total(telemetry::CACHE_HITS_TOTAL),
        metrics.counter_total(telemetry::RETRIES_TOTAL),
        client.cache_len(),
        client.available_tokens(),
    );
    for (series, summary) in metrics.histogram_summaries() {
        if [telemetry::REQUEST_DURATION_MS, telemetry::ATTEMPT_DURATION_MS].contains(&series.name()) {
            eprintln!("{series}: {}", format_summary(&summary));
        }
    }
}

fn format_summary(s: &HistogramSummary) -> String {
    format!(
        "n={} avg={:.1}ms p50={:.1}ms p95={:.1}ms p99={:.1}ms max={:.1}ms",
        s.count, s.avg, s.p50, s.p95, s.p99, s.max
    )
}
