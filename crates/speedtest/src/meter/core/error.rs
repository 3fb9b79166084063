//! Error types for the throughput meter with classification helpers

use std::error::Error;
use thiserror::Error;

/// Errors raised while configuring or running a measurement
#[derive(Error, Debug)]
pub enum MeterError {
    /// The engine was built without any address to download
    #[error("No target addresses were supplied")]
    NoAddresses,

    /// An address could not be parsed as a URL
    #[error("Invalid address '{address}': {suggestion}")]
    InvalidAddress {
        address: String,
        suggestion: String,
        #[source]
        source: url::ParseError,
    },

    /// Invalid meter configuration
    #[error("Invalid configuration: {message}")]
    Configuration {
        message: String,
        field: Option<String>,
    },

    /// Address parsed but uses a scheme the HTTP client cannot fetch
    #[error("Unsupported URL scheme '{scheme}' in '{address}' (supported: http, https)")]
    UnsupportedScheme { address: String, scheme: String },

    /// An identification header value could not be encoded
    #[error("Invalid value for header '{name}': {message}")]
    Header { name: String, message: String },

    /// The underlying HTTP client could not be created
    #[error("Failed to create HTTP client")]
    ClientBuild {
        #[source]
        source: reqwest::Error,
    },

    /// Connection, DNS or TLS failure before a response arrived
    #[error("Request to '{url}' failed")]
    Connect {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Server answered with a non-success status
    #[error("Request to '{url}' returned HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    /// Reading the response body failed mid-stream
    #[error("Download from '{url}' failed after {received} bytes")]
    Body {
        url: String,
        received: u64,
        #[source]
        source: reqwest::Error,
    },

    /// The run was cancelled before it finished
    #[error("Measurement cancelled while downloading '{url}'")]
    Cancelled { url: String },

    /// Resolving target addresses from the speed-test site failed
    #[error("Endpoint discovery failed while {stage}: {message}")]
    Discovery {
        stage: DiscoveryStage,
        message: String,
        #[source]
        source: Option<Box<MeterError>>,
    },
}

/// Classification of a [`MeterError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid engine configuration, returned before any I/O
    Construction,
    /// Malformed address or header, aborts the current transfer
    Request,
    /// Network failure while connecting or reading
    Transport,
    /// External cancellation of the run
    Cancelled,
    /// Failure in the URL discovery collaborator
    Discovery,
}

/// Step of endpoint discovery that failed, for error context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryStage {
    FetchSite,
    FindScript,
    FetchScript,
    ExtractToken,
    FetchTargets,
    ParseTargets,
    PlanAddresses,
}

impl std::fmt::Display for DiscoveryStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiscoveryStage::FetchSite => write!(f, "fetching the site page"),
            DiscoveryStage::FindScript => write!(f, "locating the app script"),
            DiscoveryStage::FetchScript => write!(f, "fetching the app script"),
            DiscoveryStage::ExtractToken => write!(f, "extracting the API token"),
            DiscoveryStage::FetchTargets => write!(f, "fetching the target list"),
            DiscoveryStage::ParseTargets => write!(f, "parsing the target list"),
            DiscoveryStage::PlanAddresses => write!(f, "planning download addresses"),
        }
    }
}

pub type Result<T> = std::result::Result<T, MeterError>;

impl MeterError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MeterError::NoAddresses
            | MeterError::InvalidAddress { .. }
            | MeterError::Configuration { .. } => ErrorKind::Construction,
            MeterError::UnsupportedScheme { .. }
            | MeterError::Header { .. }
            | MeterError::ClientBuild { .. } => ErrorKind::Request,
            MeterError::Connect { .. } | MeterError::Status { .. } | MeterError::Body { .. } => {
                ErrorKind::Transport
            }
            MeterError::Cancelled { .. } => ErrorKind::Cancelled,
            MeterError::Discovery { .. } => ErrorKind::Discovery,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            MeterError::NoAddresses => "no_addresses",
            MeterError::InvalidAddress { .. } => "invalid_address",
            MeterError::Configuration { .. } => "configuration",
            MeterError::UnsupportedScheme { .. } => "unsupported_scheme",
            MeterError::Header { .. } => "header",
            MeterError::ClientBuild { .. } => "client_build",
            MeterError::Connect { .. } => "connect",
            MeterError::Status { .. } => "status",
            MeterError::Body { .. } => "body",
            MeterError::Cancelled { .. } => "cancelled",
            MeterError::Discovery { .. } => "discovery",
        }
    }

    pub(crate) fn invalid_address(address: &str, source: url::ParseError) -> Self {
        let suggestion = match source {
            url::ParseError::EmptyHost => "URL must have a valid hostname",
            url::ParseError::InvalidPort => "Port number must be between 1 and 65535",
            url::ParseError::RelativeUrlWithoutBase => {
                "URL must be absolute (include http:// or https://)"
            }
            _ => "Check URL format and try again",
        }
        .to_string();

        MeterError::InvalidAddress {
            address: address.to_string(),
            suggestion,
            source,
        }
    }

    pub(crate) fn discovery<M: Into<String>>(stage: DiscoveryStage, message: M) -> Self {
        MeterError::Discovery {
            stage,
            message: message.into(),
            source: None,
        }
    }

    /// Wrap a failed discovery request, keeping it as the cause
    pub(crate) fn discovery_request(stage: DiscoveryStage, source: MeterError) -> Self {
        MeterError::Discovery {
            stage,
            message: "request failed".to_string(),
            source: Some(Box::new(source)),
        }
    }

    /// Error message followed by each underlying cause
    pub fn detailed_report(&self) -> String {
        let mut report = format!("Error: {}\n", self);
        report.push_str(&format!("Category: {}\n", self.category()));

        let mut source = self.source();
        while let Some(cause) = source {
            report.push_str(&format!("Caused by: {}\n", cause));
            source = cause.source();
        }

        report
    }
}
