//! Speed-test library
//!
//! This library measures download throughput: it streams one or more HTTP
//! payloads in sequence, samples progress on a fixed cadence while each body
//! arrives, and reports an aggregate bits-per-second figure.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use speedtest::{Engine, discovery::Discovery, MeterConfig};
//!
//! # async fn example() -> speedtest::Result<()> {
//! let config = MeterConfig::default();
//!
//! // Resolve a warm-up and a main payload address from the live site
//! let addresses = Discovery::with_defaults(&config)?.resolve(true).await?;
//!
//! let mut engine = Engine::with_config(addresses, config)?;
//!
//! // Live estimates, ending when the run finishes
//! let mut estimates = engine.estimates().expect("feed is only taken once");
//! let printer = tokio::spawn(async move {
//!     while let Some(estimate) = estimates.recv().await {
//!         println!("so far: {}", estimate);
//!     }
//! });
//!
//! let total = engine.run_all().await?;
//! printer.await.ok();
//! println!("Speed: {}", total);
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Live estimates**: a sampler publishes provisional rates every 250ms
//!   without ever blocking the download
//! - **Exact results**: each transfer returns a final metric from its byte count
//! - **Sequential aggregation**: per-transfer metrics merge into one figure
//! - **Decimal units**: rates render as `Bps`, `Kbps`, `Mbps`, ...
//! - **Cancellation**: runs can be aborted with a `CancellationToken`

pub mod discovery;
pub mod meter;

// Re-export commonly used types for convenience
pub use meter::{
    Engine, ErrorKind, Estimates, MeterConfig, MeterError, Metric, Result, RunReport,
    format_rate,
};
