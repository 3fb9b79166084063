//! Sequential multi-transfer engine
//!
//! The engine downloads its addresses one after another, folding each exact
//! per-transfer [`Metric`] into a running aggregate. Estimates from every
//! transfer share a single feed which closes when the run ends, whether it
//! succeeded or not.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::meter::config::MeterConfig;
use crate::meter::core::{
    EstimateSender, Estimates, HttpClient, MeterError, Metric, Result, estimate_channel,
};
use crate::meter::transfer::{TransferReport, run_transfer};

/// Result of a complete run
#[derive(Debug)]
pub struct RunReport {
    /// Merge of every per-transfer metric, in address order
    pub aggregate: Metric,
    pub transfers: Vec<TransferReport>,
}

/// Throughput engine over an ordered list of addresses
#[derive(Debug)]
pub struct Engine {
    urls: Vec<Url>,
    config: MeterConfig,
    client: HttpClient,
    sender: EstimateSender<Metric>,
    estimates: Option<Estimates<Metric>>,
}

impl Engine {
    /// Build an engine with the default configuration
    pub fn new<I, S>(addresses: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::with_config(addresses, MeterConfig::default())
    }

    /// Build an engine; fails without side effects on an empty or malformed address list
    pub fn with_config<I, S>(addresses: I, config: MeterConfig) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        config.validate()?;

        let urls = addresses
            .into_iter()
            .map(|address| parse_address(address.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        if urls.is_empty() {
            return Err(MeterError::NoAddresses);
        }

        let client = HttpClient::from_config(&config)?;
        let (sender, estimates) = estimate_channel(config.estimate_capacity);

        Ok(Self {
            urls,
            config,
            client,
            sender,
            estimates: Some(estimates),
        })
    }

    pub fn addresses(&self) -> &[Url] {
        &self.urls
    }

    pub fn config(&self) -> &MeterConfig {
        &self.config
    }

    /// Take the live estimate feed
    ///
    /// Only the first call returns the feed. It yields provisional metrics
    /// while transfers run and ends once the run returns.
    pub fn estimates(&mut self) -> Option<Estimates<Metric>> {
        self.estimates.take()
    }

    /// Download a single address outside of a full run
    ///
    /// Estimates go to the same feed as the run's.
    pub async fn download(&self, address: &str) -> Result<Metric> {
        let url = parse_address(address)?;
        let report = run_transfer(
            &self.client,
            &self.config,
            &url,
            &self.sender,
            &CancellationToken::new(),
        )
        .await?;
        Ok(report.metric)
    }

    /// Download every address in order and return the aggregate metric
    pub async fn run_all(self) -> Result<Metric> {
        self.run_all_with_cancel(CancellationToken::new()).await
    }

    /// Like [`Engine::run_all`], aborting with [`MeterError::Cancelled`] once `cancel` fires
    pub async fn run_all_with_cancel(self, cancel: CancellationToken) -> Result<Metric> {
        self.run(cancel).await.map(|report| report.aggregate)
    }

    /// Run every transfer in order, keeping the per-transfer reports
    ///
    /// The first failing transfer aborts the run; later addresses are never
    /// requested and no partial aggregate is returned.
    pub async fn run(self, cancel: CancellationToken) -> Result<RunReport> {
        let Engine {
            urls,
            config,
            client,
            sender,
            estimates,
        } = self;
        // An untaken feed has no consumer; closing it lets samplers skip work.
        drop(estimates);

        let mut aggregate = Metric::default();
        let mut transfers = Vec::with_capacity(urls.len());

        for (index, url) in urls.iter().enumerate() {
            debug!("Transfer {}/{}: {}", index + 1, urls.len(), url);
            let report = run_transfer(&client, &config, url, &sender, &cancel)
                .await
                .inspect_err(|e| warn!("Transfer of {} failed ({}): {}", url, e.category(), e))?;
            aggregate.merge(&report.metric);
            transfers.push(report);
        }

        info!(
            "Run finished: {} transfers, {} bits in {:.2?} ({})",
            transfers.len(),
            aggregate.bits(),
            aggregate.duration(),
            aggregate
        );

        Ok(RunReport {
            aggregate,
            transfers,
        })
    }
}

fn parse_address(address: &str) -> Result<Url> {
    let url = Url::parse(address).map_err(|e| MeterError::invalid_address(address, e))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(MeterError::UnsupportedScheme {
            address: address.to_string(),
            scheme: scheme.to_string(),
        }),
    }
}
