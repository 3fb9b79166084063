//! Configuration types for the throughput meter

use std::time::Duration;

use crate::meter::core::http::USER_AGENT;
use crate::meter::core::{MeterError, Result};

pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(250);
pub const DEFAULT_ESTIMATE_CAPACITY: usize = 500;
pub const DEFAULT_REFERER: &str = "https://fast.com/";
pub const DEFAULT_ORIGIN: &str = "https://fast.com";

/// Configuration for a measurement run
#[derive(Debug, Clone)]
pub struct MeterConfig {
    /// How often the sampler publishes an estimate
    pub sample_interval: Duration,
    /// Undelivered estimates held before new ones are dropped
    pub estimate_capacity: usize,
    /// Limit on connection setup only; body transfer has no deadline
    pub connect_timeout: Duration,
    pub user_agent: String,
    pub referer: String,
    pub origin: String,
    /// Keep downloaded bytes in memory instead of only counting them
    pub retain_body: bool,
}

impl MeterConfig {
    pub fn with_sample_interval(mut self, interval: Duration) -> Self {
        self.sample_interval = interval;
        self
    }

    pub fn with_estimate_capacity(mut self, capacity: usize) -> Self {
        self.estimate_capacity = capacity;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set both `Referer` and `Origin` from a site root like `https://fast.com`
    pub fn with_site<S: AsRef<str>>(mut self, site: S) -> Self {
        let origin = site.as_ref().trim_end_matches('/');
        self.origin = origin.to_string();
        self.referer = format!("{}/", origin);
        self
    }

    pub fn with_retain_body(mut self, retain: bool) -> Self {
        self.retain_body = retain;
        self
    }

    /// Reject settings that would stall or break the sampler
    pub fn validate(&self) -> Result<()> {
        if self.sample_interval.is_zero() {
            return Err(MeterError::Configuration {
                message: "sample interval must be greater than zero".to_string(),
                field: Some("sample_interval".to_string()),
            });
        }
        if self.estimate_capacity == 0 {
            return Err(MeterError::Configuration {
                message: "estimate capacity must be at least 1".to_string(),
                field: Some("estimate_capacity".to_string()),
            });
        }
        Ok(())
    }
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
            estimate_capacity: DEFAULT_ESTIMATE_CAPACITY,
            connect_timeout: Duration::from_secs(30),
            user_agent: USER_AGENT.clone(),
            referer: DEFAULT_REFERER.to_string(),
            origin: DEFAULT_ORIGIN.to_string(),
            retain_body: false,
        }
    }
}
