//! Core types used throughout the meter
//!
//! Everything here is independent of how a run is orchestrated: the metric
//! value and its formatting, the error taxonomy, the estimate feed, the
//! observable byte sink and the HTTP client.

pub mod channel;
pub mod error;
pub mod http;
pub mod metric;
pub mod sink;
pub mod units;

// Re-export main types for convenience
pub use channel::{EstimateSender, Estimates, Publish, estimate_channel};
pub use error::{DiscoveryStage, ErrorKind, MeterError, Result};
pub use http::{HttpClient, USER_AGENT};
pub use metric::Metric;
pub use sink::{ByteCounter, CountingSink};
pub use units::{format_rate, scale_rate};
