//! Meter module
//!
//! This module contains the measurement machinery: core types, the
//! configuration, the progress sampler, single transfers and the
//! sequential engine that ties them together.

pub mod config;
pub mod core;
pub mod engine;
pub mod sampler;
pub mod transfer;

// Re-export main types for convenience
pub use config::MeterConfig;
pub use self::core::{
    ByteCounter, CountingSink, DiscoveryStage, ErrorKind, EstimateSender, Estimates, HttpClient,
    MeterError, Metric, Publish, Result, estimate_channel, format_rate,
};
pub use engine::{Engine, RunReport};
pub use sampler::{Sampler, SamplerStats};
pub use transfer::TransferReport;
