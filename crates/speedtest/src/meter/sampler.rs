//! Periodic progress sampler for a single transfer
//!
//! While a body is streaming, a [`Sampler`] task wakes on a fixed cadence,
//! reads the shared [`ByteCounter`] and publishes a provisional [`Metric`].
//! Publishing never blocks: a full feed just loses that estimate.
//!
//! [`Sampler::stop`] cancels the task and waits for it to exit, so once it
//! returns no further estimate can appear and the counter is no longer read.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::meter::core::{ByteCounter, EstimateSender, Metric, Publish};

/// Counts reported by a sampler after it stopped
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SamplerStats {
    pub ticks: u64,
    pub published: u64,
    pub dropped: u64,
}

/// Handle to a running sampler task
#[derive(Debug)]
pub struct Sampler {
    cancel: CancellationToken,
    handle: Option<JoinHandle<SamplerStats>>,
}

impl Sampler {
    /// Spawn a sampler measuring from `started`
    ///
    /// The first estimate is taken one `interval` after the sampler starts.
    pub fn start(
        counter: ByteCounter,
        started: Instant,
        interval: Duration,
        sender: EstimateSender<Metric>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        debug!("Starting sampler with {:?} interval", interval);
        let handle = tokio::spawn(async move {
            let mut stats = SamplerStats::default();
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                stats.ticks += 1;
                let estimate = Metric::from_bytes(started.elapsed(), counter.get());
                match sender.publish(estimate) {
                    Publish::Delivered => {
                        stats.published += 1;
                        trace!("Published estimate {}", estimate);
                    }
                    Publish::Dropped => {
                        stats.dropped += 1;
                        trace!("Estimate feed full, dropped {}", estimate);
                    }
                    // nobody is listening anymore
                    Publish::Closed => break,
                }
            }

            stats
        });

        Self {
            cancel,
            handle: Some(handle),
        }
    }

    /// Stop sampling and wait for the task to exit
    pub async fn stop(mut self) -> SamplerStats {
        self.cancel.cancel();
        let stats = match self.handle.take() {
            Some(handle) => match handle.await {
                Ok(stats) => stats,
                Err(e) => {
                    debug!("Sampler task ended abnormally: {}", e);
                    SamplerStats::default()
                }
            },
            None => SamplerStats::default(),
        };
        debug!(
            "Sampler stopped after {} ticks ({} published, {} dropped)",
            stats.ticks, stats.published, stats.dropped
        );
        stats
    }
}

impl Drop for Sampler {
    // An abandoned transfer future still has to stop its sampler.
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
