//! Bounded estimate feed with non-blocking, drop-on-full publishing
//!
//! The producer side never waits: when the buffer is full the newest value is
//! discarded so a slow consumer can never stall the download being measured.
//! The stream ends once every sender has been dropped.

use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc::{self, error::TrySendError};

/// Outcome of a publish attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Publish {
    Delivered,
    /// Buffer full, value discarded
    Dropped,
    /// Receiver gone, value discarded
    Closed,
}

/// Create a feed holding at most `capacity` undelivered values
///
/// # Panics
///
/// Panics if `capacity` is zero; callers validate it through `MeterConfig`.
pub fn estimate_channel<T>(capacity: usize) -> (EstimateSender<T>, Estimates<T>) {
    let (tx, rx) = mpsc::channel(capacity);
    let dropped = Arc::new(AtomicU64::new(0));
    (
        EstimateSender {
            tx,
            dropped: dropped.clone(),
        },
        Estimates { rx, dropped },
    )
}

/// Producer half; cloning it keeps the feed open
#[derive(Debug)]
pub struct EstimateSender<T> {
    tx: mpsc::Sender<T>,
    dropped: Arc<AtomicU64>,
}

impl<T> Clone for EstimateSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            dropped: self.dropped.clone(),
        }
    }
}

impl<T> EstimateSender<T> {
    /// Offer a value without waiting
    pub fn publish(&self, value: T) -> Publish {
        match self.tx.try_send(value) {
            Ok(()) => Publish::Delivered,
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                Publish::Dropped
            }
            Err(TrySendError::Closed(_)) => Publish::Closed,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer half, usable directly with `recv` or as a [`Stream`]
#[derive(Debug)]
pub struct Estimates<T> {
    rx: mpsc::Receiver<T>,
    dropped: Arc<AtomicU64>,
}

impl<T> Estimates<T> {
    /// Next value, or `None` once every sender is gone and the buffer is drained
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Number of values discarded because the buffer was full
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Drain until the feed closes
    pub async fn collect_all(mut self) -> Vec<T> {
        let mut values = Vec::new();
        while let Some(value) = self.recv().await {
            values.push(value);
        }
        values
    }
}

impl<T> Stream for Estimates<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.rx.poll_recv(cx)
    }
}
