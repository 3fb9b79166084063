//! HTTP client shared by every transfer of a run
//!
//! Requests carry the same identification headers a browser visiting the
//! speed-test site would send: a descriptive `User-Agent` plus `Referer` and
//! `Origin` naming the site.

use once_cell::sync::Lazy;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ORIGIN, REFERER};
use reqwest::{Client, Response};
use tracing::debug;
use url::Url;

use crate::meter::config::MeterConfig;
use crate::meter::core::{MeterError, Result};

/// Site the client identifies itself as measuring for
pub const PROJECT_URL: &str = "https://fast.com";

/// Process-wide client identification, computed once
pub static USER_AGENT: Lazy<String> = Lazy::new(|| {
    format!(
        "Fast/{} (+{}; rustc/{}-{})",
        env!("CARGO_PKG_VERSION"),
        PROJECT_URL,
        std::env::consts::OS,
        std::env::consts::ARCH,
    )
});

/// Thin wrapper over [`reqwest::Client`] with identification headers preset
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn from_config(config: &MeterConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(REFERER, header_value(&REFERER, &config.referer)?);
        headers.insert(ORIGIN, header_value(&ORIGIN, &config.origin)?);

        let client = Client::builder()
            .user_agent(header_value(&reqwest::header::USER_AGENT, &config.user_agent)?)
            .default_headers(headers)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|source| MeterError::ClientBuild { source })?;

        Ok(Self { client })
    }

    /// Issue a GET and return the response once headers arrive
    ///
    /// Non-success statuses are reported as [`MeterError::Status`].
    pub async fn get(&self, url: &Url) -> Result<Response> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| MeterError::Connect {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        debug!("{} answered {} (content length {:?})", url, status, response.content_length());
        if !status.is_success() {
            return Err(MeterError::Status {
                url: url.to_string(),
                status,
            });
        }

        Ok(response)
    }

    /// Fetch a small document in full, used by endpoint discovery
    pub async fn get_text(&self, url: &Url) -> Result<String> {
        let response = self.get(url).await?;
        response.text().await.map_err(|source| MeterError::Body {
            url: url.to_string(),
            received: 0,
            source,
        })
    }
}

fn header_value(name: &HeaderName, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| MeterError::Header {
        name: name.to_string(),
        message: e.to_string(),
    })
}
