//! Single streamed download with live sampling
//!
//! One transfer is one request/response cycle. The clock starts right before
//! the request is sent so connection setup counts toward the duration. Once
//! headers arrive a [`Sampler`] watches the sink while the body is copied,
//! and it is stopped on every way out of the copy, success or failure.

use futures::StreamExt;
use reqwest::Response;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

use crate::meter::config::MeterConfig;
use crate::meter::core::{CountingSink, EstimateSender, HttpClient, MeterError, Metric, Result};
use crate::meter::sampler::{Sampler, SamplerStats};

/// Everything observed during one completed transfer
#[derive(Debug)]
pub struct TransferReport {
    pub url: Url,
    /// Exact metric from the final byte count and elapsed time
    pub metric: Metric,
    pub sampler: SamplerStats,
    /// Body bytes when the config asks to retain them
    pub body: Option<Vec<u8>>,
}

/// Download `url` to completion, publishing estimates along the way
pub(crate) async fn run_transfer(
    client: &HttpClient,
    config: &MeterConfig,
    url: &Url,
    estimates: &EstimateSender<Metric>,
    cancel: &CancellationToken,
) -> Result<TransferReport> {
    let started = Instant::now();

    let response = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(cancelled(url)),
        response = client.get(url) => response?,
    };

    let mut sink = if config.retain_body {
        CountingSink::retaining()
    } else {
        CountingSink::discarding()
    };
    let sampler = Sampler::start(
        sink.counter(),
        started,
        config.sample_interval,
        estimates.clone(),
    );

    let copied = copy_body(response, &mut sink, url, cancel).await;
    let elapsed = started.elapsed();
    let sampler = sampler.stop().await;
    copied?;

    let metric = Metric::from_bytes(elapsed, sink.len());
    info!(
        "Downloaded {} bytes from {} in {:.2?} ({})",
        sink.len(),
        url,
        metric.duration(),
        metric
    );

    Ok(TransferReport {
        url: url.clone(),
        metric,
        sampler,
        body: sink.into_inner(),
    })
}

async fn copy_body(
    response: Response,
    sink: &mut CountingSink,
    url: &Url,
    cancel: &CancellationToken,
) -> Result<()> {
    let mut stream = response.bytes_stream();

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled(url)),
            next = stream.next() => next,
        };

        match next {
            Some(Ok(chunk)) => sink.write(&chunk),
            Some(Err(source)) => {
                debug!("Body read from {} failed after {} bytes", url, sink.len());
                return Err(MeterError::Body {
                    url: url.to_string(),
                    received: sink.len(),
                    source,
                });
            }
            None => return Ok(()),
        }
    }
}

fn cancelled(url: &Url) -> MeterError {
    MeterError::Cancelled {
        url: url.to_string(),
    }
}
