use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use speedtest::discovery::{DEFAULT_API_URL, DEFAULT_SITE_URL, Discovery};
use speedtest::{Engine, MeterConfig, Metric};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

const TICK: &str = "⠁⠂⠄⡀⢀⠠⠐⠈ ";

/// Measure download throughput against fast.com
#[derive(Debug, Parser)]
#[command(name = "fast", version, about)]
struct Args {
    /// Download these addresses instead of discovering them (repeatable)
    #[arg(long = "url", value_name = "URL")]
    urls: Vec<String>,

    /// Skip the small warm-up download before the main payload
    #[arg(long)]
    no_warmup: bool,

    /// Milliseconds between live estimates
    #[arg(long, default_value_t = 250)]
    interval_ms: u64,

    /// Site used for token discovery and the Referer/Origin headers
    #[arg(long, default_value = DEFAULT_SITE_URL)]
    site_url: String,

    /// Endpoint listing download targets
    #[arg(long, default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Log more details to stderr (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "speedtest=debug,info",
        _ => "speedtest=trace,debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn spinner() -> ProgressBar {
    let spin = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("\t{spinner}  {msg}") {
        spin.set_style(style.tick_chars(TICK));
    }
    spin.enable_steady_tick(Duration::from_millis(100));
    spin.set_message("Connecting to server...");
    spin
}

async fn run(args: Args) -> Result<Metric> {
    let config = MeterConfig::default()
        .with_sample_interval(Duration::from_millis(args.interval_ms))
        .with_site(&args.site_url);

    let addresses = if args.urls.is_empty() {
        println!("Getting API token...");
        Discovery::new(&config, &args.site_url, &args.api_url)
            .context("creating discovery client failed")?
            .resolve(!args.no_warmup)
            .await
            .context("getting urls failed")?
    } else {
        args.urls
    };

    let mut engine =
        Engine::with_config(addresses, config).context("creating downloader failed")?;

    println!("Starting download test...");
    println!();

    let spin = spinner();
    let mut estimates = engine.estimates().context("estimate feed unavailable")?;
    let display = spin.clone();
    let consumer = tokio::spawn(async move {
        while let Some(estimate) = estimates.recv().await {
            display.set_message(estimate.to_string());
        }
    });

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let result = engine.run_all_with_cancel(cancel).await;
    let _ = consumer.await;
    spin.finish_and_clear();

    result.context("downloading failed")
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(args).await {
        Ok(metric) => {
            println!("Speed: {}", metric);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
